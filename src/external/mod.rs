pub mod alphavantage;
pub mod coinmarketcap;
pub mod financialmodelingprep;
pub mod provider;
