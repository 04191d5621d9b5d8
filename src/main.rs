//! dsdiff compares two flat XML datasets and reports the first difference.
//!
//! Usage: dsdiff [--sensing] [--dump] EXPECTED.xml ACTUAL.xml

use anyhow::{bail, Context};
use fixtureset::{assert_data_sets_equal, CachedDataSet, Config, Error, FlatXmlProducer};
use tracing_subscriber::EnvFilter;

fn load(path: &str, config: &Config) -> anyhow::Result<CachedDataSet> {
    let mut producer = FlatXmlProducer::from_file(path, config)
        .with_context(|| format!("reading {}", path))?;
    CachedDataSet::from_producer(&mut producer, config)
        .with_context(|| format!("loading {}", path))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::new();
    let mut dump = false;
    let mut paths = vec![];
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--sensing" => config = config.with_column_sensing(true),
            "--dump" => dump = true,
            _ => paths.push(arg),
        }
    }
    if paths.len() != 2 {
        bail!("usage: dsdiff [--sensing] [--dump] EXPECTED.xml ACTUAL.xml");
    }

    let expected = load(&paths[0], &config)?;
    let actual = load(&paths[1], &config)?;
    if dump {
        print!("{}", fixtureset::formatting::format_data_set(&expected, true)?);
        print!("{}", fixtureset::formatting::format_data_set(&actual, true)?);
    }
    match assert_data_sets_equal(&expected, &actual) {
        Ok(()) => {
            println!("datasets are equal");
            Ok(())
        }
        Err(Error::Comparison(failure)) => {
            println!("{}", failure);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
