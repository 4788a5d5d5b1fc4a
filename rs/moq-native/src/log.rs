use std::sync::Once;

/// The recognized log levels, matching the `tracing` severity levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogLevel {
	Trace,
	Debug,
	#[default]
	Info,
	Warn,
	Error,
}

impl LogLevel {
	fn as_str(&self) -> &'static str {
		match self {
			Self::Trace => "trace",
			Self::Debug => "debug",
			Self::Info => "info",
			Self::Warn => "warn",
			Self::Error => "error",
		}
	}
}

impl std::str::FromStr for LogLevel {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"trace" => Ok(Self::Trace),
			"debug" => Ok(Self::Debug),
			"info" => Ok(Self::Info),
			"warn" | "warning" => Ok(Self::Warn),
			"error" => Ok(Self::Error),
			other => anyhow::bail!("unknown log level: {other}"),
		}
	}
}

static INIT: Once = Once::new();

/// Install the global `tracing` subscriber at the given level.
///
/// This is a process-wide, one-time step: a second call is a no-op, regardless of the
/// level requested the second time around. Downstream crates should call this (or their
/// own subscriber) exactly once before connecting any session.
pub fn init(level: LogLevel) {
	INIT.call_once(|| {
		let filter = tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_str()));

		tracing_subscriber::fmt().with_env_filter(filter).init();
	});
}
