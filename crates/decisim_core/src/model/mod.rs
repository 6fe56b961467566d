mod assumption;
mod correlation;
mod distribution;
mod results;

pub use assumption::{Assumption, DistributionKind, Params};
pub use correlation::CorrelationMatrix;
pub use distribution::{Distribution, standard_normal_cdf, standard_normal_quantile};
pub use results::{OutcomeVector, SampleSet, SimulationRun};
