pub mod derived;
pub mod export;
pub mod gateway;
pub mod hold;
pub mod session;
pub mod split;
pub mod store;
pub mod sweep;
pub mod trend;

pub use derived::{DerivedMetricCalculator, DerivedTrendBundle};
pub use export::{ExportTable, Exporter};
pub use gateway::IngestionGateway;
pub use hold::{DisplayRole, HoldManager, SessionSnapshot};
pub use session::{Effect, HeldSweep, Session, SessionEvent, SweepView, TrendView};
pub use split::{InjectionSplit, InjectionSplitter, SegmentedBundle, SegmentedSeries};
pub use store::{InsertOutcome, InsertPolicy, ResultStore};
pub use sweep::{ChargeMap, ChargePoint, SweepAggregator, SweepDisplay, SweepProgress};
pub use trend::{RawTrends, TrendReconstructor};
