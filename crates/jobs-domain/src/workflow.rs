/// A named, reusable definition of the input parameters job executions
/// must supply. Immutable once jobs reference it. Deserializable from
/// YAML or JSON config files.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Workflow {
    /// Unique key. The store rejects re-insertion of a taken name.
    pub name: String,
    /// Names of required parameters, in declared order.
    #[serde(default)]
    pub input_parameters: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_from_yaml() {
        let yaml = r"
name: provision-device
input_parameters:
  - host
  - user
";
        let workflow: Workflow = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(workflow.name, "provision-device");
        assert_eq!(workflow.input_parameters, vec!["host", "user"]);
    }

    #[test]
    fn input_parameters_default_to_empty() {
        let workflow: Workflow = serde_json::from_str(r#"{"name": "noop"}"#).unwrap();
        assert!(workflow.input_parameters.is_empty());
    }

    #[test]
    fn json_round_trip() {
        let workflow = Workflow {
            name: "w1".to_string(),
            input_parameters: vec!["host".to_string()],
        };
        let json = serde_json::to_string(&workflow).unwrap();
        let back: Workflow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "w1");
        assert_eq!(back.input_parameters, vec!["host"]);
    }
}
