pub mod evolution;
pub mod individual;
pub mod phenotype;
pub mod population;
pub mod worker;
