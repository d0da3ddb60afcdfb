#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when samples are requested from a model that has not been fitted.
    #[error("{model} has not been fitted")]
    NotFitted {
        /// The kind of model that was asked for samples.
        model: &'static str,
    },

    /// Returned when parameter names are requested for a family that is
    /// registered in neither catalog.
    #[error("distribution '{name}' not found in the continuous or discrete catalog")]
    UnsupportedFamily {
        /// The name of the unregistered family.
        name: String,
    },

    /// Returned when a catalog lookup by name finds nothing.
    #[error("unknown distribution family '{name}'")]
    UnknownFamily {
        /// The requested name.
        name: String,
    },

    /// Returned when a raw parameter tuple does not match the family's arity.
    #[error("family '{family}' expects {expected} parameters, got {got}")]
    ParameterCount {
        /// The family name.
        family: &'static str,
        /// The number of declared parameters.
        expected: usize,
        /// The number of values supplied.
        got: usize,
    },

    /// Returned when a fixed parameter is not declared by the family.
    #[error("family '{family}' has no parameter named '{name}'")]
    UnknownParameter {
        /// The family name.
        family: &'static str,
        /// The offending parameter name.
        name: String,
    },

    /// Returned when a fixed shape parameter was not supplied.
    #[error("family '{family}' requires parameter '{name}'")]
    MissingParameter {
        /// The family name.
        family: &'static str,
        /// The missing parameter name.
        name: String,
    },

    /// Returned when fixed parameter values lie outside the family's
    /// parameter space (for example a non-positive scale).
    #[error("invalid parameter values for family '{family}'")]
    InvalidParameters {
        /// The family name.
        family: &'static str,
    },

    /// Returned when fitting a pinned family to data fails.
    #[error("failed to fit '{family}': {source}")]
    Fit {
        /// The family that could not be fitted.
        family: &'static str,
        /// Why the fit failed.
        #[source]
        source: FitError,
    },

    /// Returned when a model is fitted on an empty sample array.
    #[error("cannot fit a model on zero samples")]
    EmptySamples,

    /// Returned when sample rows have inconsistent lengths.
    #[error("dimension mismatch: expected {expected} columns but row {row} has {got}")]
    DimensionMismatch {
        /// The expected number of columns.
        expected: usize,
        /// The actual number of columns in the row.
        got: usize,
        /// The index of the mismatched row.
        row: usize,
    },

    /// Returned when a mixture component's covariance is not positive
    /// definite.
    #[error("covariance of mixture component {component} is not positive definite")]
    SingularCovariance {
        /// Index of the offending component.
        component: usize,
    },

    /// Returned when the divergence threshold is not a positive number.
    #[error("invalid divergence threshold: {0} must be positive")]
    InvalidThreshold(f64),

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;

/// Why a single family could not be fitted to a batch of samples.
///
/// During automatic selection these are expected and mean "this family does
/// not apply"; they only surface as [`Error::Fit`] when a family was pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FitError {
    /// No samples were given.
    #[error("no samples to fit")]
    Empty,
    /// The samples contain NaN or infinite values.
    #[error("samples contain non-finite values")]
    NonFinite,
    /// The samples have zero spread.
    #[error("samples are degenerate (zero spread)")]
    Degenerate,
    /// Some samples lie outside the family's support.
    #[error("samples lie outside the support of the family")]
    OutsideSupport,
    /// The likelihood optimum could not be located.
    #[error("maximum likelihood estimation did not converge")]
    NotConverged,
    /// The fitted parameters produced samples the divergence estimator could
    /// not score.
    #[error("divergence estimate is not finite")]
    Unscored,
}

/// Why a clustering run could not produce a usable partition.
///
/// The component-count search treats these as a signal to stop and keep the
/// best count found so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClusteringError {
    /// Fewer distinct points than requested clusters.
    #[error("requested {requested} clusters but the data has only {distinct} distinct points")]
    TooFewDistinctPoints {
        /// The requested number of clusters.
        requested: usize,
        /// The number of distinct sample rows.
        distinct: usize,
    },
    /// The labelling has a cluster count the silhouette is undefined for.
    #[error("silhouette needs between 2 and {max} labels, got {labels}")]
    InvalidLabelCount {
        /// The number of distinct labels.
        labels: usize,
        /// The largest admissible number of labels (samples minus one).
        max: usize,
    },
}
