pub type RequestId = u64;
pub type TimerId = u64;

/// Outcome of a best-effort resource load, as reported back to the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded { bytes: usize },
    Failed { error: String },
}
