//! Live trend core for electrochemical sweep experiments.
//!
//! Results arrive out of order and with gaps from an external analysis
//! pipeline. They are keyed by (electrode, frequency, file sequence) in a
//! sparse store, and every view is rebuilt from that store on demand:
//! dense peak trends, normalized trends, the kinetic differential metric,
//! injection segments, and the frequency-sweep overlay with its held
//! comparison snapshot.

pub mod interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{AnalysisScopeParams, Electrode, RenderSink, RenderTarget, TrendError, TrendResult};
pub use processing::{IngestionGateway, Session, SessionEvent};
