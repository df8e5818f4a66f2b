//! Configuration for the legalization run.

/// Settings derived from the command line.
#[derive(Clone, Debug)]
pub struct Config {
    /// Input file prefix; `<prefix>.aux` names the design.
    pub input_prefix: String,
    /// Output file prefix for the emitted design.
    pub output_prefix: String,
    pub refine: RefineConfig,
}

impl Config {
    /// Construct a baseline configuration from the clap argument matches.
    pub fn from_args(matches: &clap::ArgMatches) -> Self {
        Config {
            input_prefix: matches.value_of("INPUT").unwrap().to_owned(),
            output_prefix: matches.value_of("OUTPUT").unwrap().to_owned(),
            refine: RefineConfig::default(),
        }
    }
}

/// Tunables of the displacement-reduction pass.
#[derive(Clone, Debug)]
pub struct RefineConfig {
    /// Slack added to a cell's current displacement to form its relocation
    /// search radius, in layout units.
    pub search_slack: f64,
    /// Upper bound on full improvement iterations.
    pub max_iterations: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            search_slack: 20.0,
            max_iterations: 6,
        }
    }
}
