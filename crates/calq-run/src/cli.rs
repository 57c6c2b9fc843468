use std::time::Instant;

use calq_lang::{Engine, Error, ExecutionMode, Number, Options, Variables};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "calq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To evaluate a formula:\n\
    calq '1 + 2 * 3'\n\n\
    ## To bind variables:\n\
    calq -v x=4 -v y=0.5 'max(x, 2) * sin(y)'\n\n\
    ## To bind a constant when the formula is built:\n\
    calq -c k=10 -v x=5 'x + k'")]
#[command(about = "calq evaluates numeric formulas with exact decimal arithmetic.", long_about = None)]
pub struct Cli {
    /// Sets a variable, can be repeated
    #[arg(short = 'v', long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
    variables: Vec<(String, Number)>,

    /// Binds a constant into the formula when it is built, can be repeated
    #[arg(short = 'c', long = "constant", value_name = "NAME=VALUE", value_parser = parse_binding)]
    constants: Vec<(String, Number)>,

    /// Strategy used to evaluate the formula
    #[arg(long, value_enum, default_value_t = Mode::Compiled)]
    mode: Mode,

    /// Disable constant folding
    #[arg(long, default_value_t = false)]
    no_optimize: bool,

    /// Treat variable, function and constant names as case-sensitive
    #[arg(long, default_value_t = false)]
    case_sensitive: bool,

    /// Evaluate the formula this many times and log the elapsed time
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    repeat: u32,

    formula: String,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum Mode {
    Interpreted,
    #[default]
    Compiled,
}

impl From<Mode> for ExecutionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Interpreted => ExecutionMode::Interpreted,
            Mode::Compiled => ExecutionMode::Compiled,
        }
    }
}

fn parse_binding(s: &str) -> Result<(String, Number), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let name = name.trim();

    if name.is_empty() {
        return Err(format!("missing name in `{s}`"));
    }

    let value = value
        .trim()
        .parse::<Number>()
        .map_err(|e| format!("invalid number `{}`: {e}", value.trim()))?;

    Ok((name.to_string(), value))
}

fn to_variables(bindings: &[(String, Number)]) -> Variables {
    bindings
        .iter()
        .map(|(name, value)| (name.as_str().into(), *value))
        .collect()
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        let engine = Engine::new(Options {
            case_sensitive: self.case_sensitive,
            optimizer_enabled: !self.no_optimize,
            execution_mode: self.mode.into(),
            ..Options::default()
        });

        let variables = to_variables(&self.variables);
        let constants = to_variables(&self.constants);

        let started = Instant::now();
        let mut value = self.evaluate(&engine, &variables, &constants)?;
        for _ in 1..self.repeat {
            value = self.evaluate(&engine, &variables, &constants)?;
        }

        info!(
            repeat = self.repeat,
            elapsed = ?started.elapsed(),
            mode = ?self.mode,
            "evaluated formula"
        );

        println!("{value}");
        Ok(())
    }

    #[allow(clippy::result_large_err)]
    fn evaluate(&self, engine: &Engine, variables: &Variables, constants: &Variables) -> Result<Number, Error> {
        if constants.is_empty() {
            return engine.calculate(&self.formula, variables);
        }

        let formula = engine.build(&self.formula, Some(constants))?;
        let variables = self.with_engine_constants(engine, variables);
        formula(&variables).map_err(|e| Error::from_error(self.formula.as_str(), e))
    }

    /// Adds the engine constants that no `--var` binding shadows, like `calculate` does.
    fn with_engine_constants(&self, engine: &Engine, variables: &Variables) -> Variables {
        let shadowed = |name: &str| {
            variables.keys().any(|key| {
                if self.case_sensitive {
                    key == name
                } else {
                    key.eq_ignore_ascii_case(name)
                }
            })
        };

        let mut variables = variables.clone();
        for constant in engine.constant_registry().iter() {
            if !shadowed(constant.name.as_str()) {
                variables.insert(constant.name, constant.value);
            }
        }
        variables
    }
}
