use std::collections::BTreeMap;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Bash,
    Env,
    Yaml,
}

impl OutputFormat {
    /// Format named values according to the output format.
    ///
    /// Keys are optionally uppercased and then prefixed, so `--prefix TF_VAR_`
    /// with `key_id` yields `TF_VAR_key_id` (or `TF_VAR_KEY_ID` when uppercased).
    pub fn format_values(
        &self,
        values: &BTreeMap<String, String>,
        prefix: Option<&str>,
        uppercase: bool,
    ) -> String {
        let transform_key = |key: &str| -> String {
            let mut transformed_key = key.to_string();

            if uppercase {
                transformed_key = transformed_key.to_uppercase();
            }

            if let Some(prefix) = prefix {
                transformed_key = format!("{}{}", prefix, transformed_key);
            }

            transformed_key
        };

        let transformed: BTreeMap<String, &String> = values
            .iter()
            .map(|(key, value)| (transform_key(key), value))
            .collect();

        match self {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&transformed).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Bash => transformed
                .iter()
                .map(|(key, value)| {
                    format!(
                        "export {}={}",
                        key,
                        shell_escape::escape(value.as_str().into())
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Env => transformed
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&transformed).unwrap_or_else(|_| "---\n{}\n".to_string())
            }
        }
    }
}
