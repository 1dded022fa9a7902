pub mod dna;
pub mod rle;
