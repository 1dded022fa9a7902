pub mod kmer;
pub mod reference;
