use super::assemble;
use crate::cli::QuantitiesArgs;
use crate::config::{RunOverrides, build_config};
use crate::error::Result;
use mdops::core::logger::Logger;

pub fn run(args: QuantitiesArgs) -> Result<()> {
    let config = build_config(&args.config, &args.set_values, &RunOverrides::default())?;
    let assembly = assemble(&config)?;

    for line in describe(&assembly.logger) {
        println!("{line}");
    }
    Ok(())
}

fn describe(logger: &Logger) -> Vec<String> {
    let namespaces = logger.namespaces();
    let width = namespaces
        .iter()
        .map(|namespace| namespace.to_string().len())
        .max()
        .unwrap_or(0);
    namespaces
        .iter()
        .filter_map(|namespace| {
            logger
                .get(namespace)
                .map(|entry| format!("{:<width$}  {}", namespace.to_string(), entry.flag()))
        })
        .collect()
}
