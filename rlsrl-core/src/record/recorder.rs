use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
///
/// Progress records of a training run reach a recorder through the progress
/// callback, see [`recording_callback`](crate::recording_callback).
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);
}
