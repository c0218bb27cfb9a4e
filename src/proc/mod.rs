pub mod counters;
pub mod enumerate;
pub mod memscan;
pub mod rates;
