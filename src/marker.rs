/// Immutable per-marker metadata (spec.md §3). Markers on a chromosome are
/// strictly non-decreasing in base position.
#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub chrom_id: u32,
    pub bp: i32,
    pub cm: f64,
    pub n_alleles: u32,
}
