use super::AnalysisSnapshot;

/// Source of analysis snapshots.
///
/// Implementations own the audio pipeline; the timegrapher core only calls
/// them from the refresh tick and never concurrently.
pub trait AnalysisEngine {
    /// Update `windows` in place and return the signal strength.
    ///
    /// `bph_hint` is 0 when the beat rate should be detected automatically.
    /// Events older than `events_from` have already been consumed and need
    /// not be reported again. A return value of 0 means no lock; larger
    /// magnitudes mean more windows agree.
    fn analyze(&mut self, windows: &mut [AnalysisSnapshot], bph_hint: u32, events_from: u64)
    -> i32;

    /// Current absolute sample count of the audio stream.
    fn timestamp(&self) -> u64;
}

impl<E: AnalysisEngine + ?Sized> AnalysisEngine for Box<E> {
    fn analyze(
        &mut self,
        windows: &mut [AnalysisSnapshot],
        bph_hint: u32,
        events_from: u64,
    ) -> i32 {
        (**self).analyze(windows, bph_hint, events_from)
    }

    fn timestamp(&self) -> u64 {
        (**self).timestamp()
    }
}
