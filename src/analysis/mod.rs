pub mod ast;
pub mod filo;
pub mod motility;
pub mod polynomial;
pub mod puncta;
pub mod sholl;
pub mod tdbl;

pub use ast::{classify_series, AstResult};
pub use filo::{filo_count, filo_density, filo_lengths, total_filo_length};
pub use motility::{motility, Motility};
pub use polynomial::Polynomial;
pub use puncta::{per_puncta_intensity, per_puncta_size};
pub use sholl::{sholl_crossings, sholl_metrics, ShollMetrics};
pub use tdbl::tdbl;
