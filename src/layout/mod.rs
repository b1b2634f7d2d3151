pub mod dendrogram;

pub use dendrogram::{layout_dendrogram, layout_series, DendrogramLayout, SideMemo};
