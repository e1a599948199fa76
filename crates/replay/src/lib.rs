//! Playback side: a replay cursor over loaded record sequences and a
//! position smoother for visually stable output.

pub mod cursor;
pub mod smoother;
