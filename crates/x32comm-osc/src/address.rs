//! Console address conventions.

/// The fader control address for an input channel.
///
/// The channel is zero-padded to two digits. It is not range-checked; channels
/// with three or more digits are rendered as-is.
pub fn fader_path(channel: u32) -> String {
    format!("/ch/{channel:02}/mix/fader")
}
