pub mod column;
pub mod config;
pub mod error;
pub mod extend;
pub mod genmap;
pub mod interner;
pub mod marker;
pub mod pbwt;
pub mod pipeline;
pub mod report;
pub mod samples;
pub mod seeds;
pub mod segments;
pub mod seqcoder;
pub mod variants;
pub mod vcf;
pub mod windows;
pub mod worker;
pub mod writer;
