pub mod output;
pub mod volume;

pub use output::{write_table, write_table_csv};
pub use volume::{estimate_channel_count, MemoVolumeCache, Volume, VolumeProvider};
