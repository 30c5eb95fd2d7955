use crate::cli::OutputFormat;
use crate::error::{CliError, Result};
use mdops::workflows::run::RunResult;

pub fn render(result: &RunResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).map_err(|e| CliError::Output(e.into()))
        }
        OutputFormat::Toml => {
            toml::to_string_pretty(result).map_err(|e| CliError::Output(e.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdops::core::logger::{LogNode, LogTree};
    use mdops::core::namespace::Namespace;
    use mdops::core::quantity::{LogFlag, LogValue};
    use mdops::workflows::run::Snapshot;

    fn result() -> RunResult {
        let mut data = LogTree::new();
        data.set_item(
            &Namespace::from(["mdops", "Simulation", "timestep"]),
            LogNode::Tagged(LogValue::Int(10), LogFlag::Scalar),
        )
        .unwrap();
        RunResult {
            initial_timestep: 0,
            final_timestep: 10,
            snapshots: vec![Snapshot { timestep: 10, data }],
        }
    }

    #[test]
    fn json_output_nests_namespaces() {
        let rendered = render(&result(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["final_timestep"], 10);
        assert_eq!(
            value["snapshots"][0]["data"]["mdops"]["Simulation"]["timestep"],
            serde_json::json!([10, "scalar"])
        );
    }

    #[test]
    fn toml_output_is_valid_toml() {
        let rendered = render(&result(), OutputFormat::Toml).unwrap();
        let table: toml::Table = toml::from_str(&rendered).unwrap();

        let snapshot = &table["snapshots"][0];
        assert_eq!(snapshot["timestep"].as_integer(), Some(10));
        let timestep = &snapshot["data"]["mdops"]["Simulation"]["timestep"];
        assert_eq!(timestep[0].as_integer(), Some(10));
        assert_eq!(timestep[1].as_str(), Some("scalar"));
    }
}
