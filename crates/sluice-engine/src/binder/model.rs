//! Operator models: what the binder knows about primitive operators
//!
//! Models describe ports, parameters, custom literals and custom output
//! functions. A small standard toolkit is built in; further models load from
//! JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::error::ModelError;

/// How a parameter's actual may be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpressionMode {
    Constant,
    AttributeFree,
    Attribute,
    #[default]
    Expression,
    CustomLiteral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowingMode {
    #[default]
    NonWindowed,
    Windowed,
    OptionallyWindowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PunctuationMode {
    #[default]
    Oblivious,
    Aware,
    Generating,
}

/// One parameter descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterModel {
    pub name: String,
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    /// Number of values; negative means unbounded
    #[serde(default = "default_cardinality")]
    pub cardinality: i32,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub expression_mode: ExpressionMode,
    /// Input ports whose attributes the actual may use; empty means all
    #[serde(default)]
    pub port_scope: Vec<usize>,
    /// Custom output function set visible in the actual
    #[serde(default)]
    pub custom_output_function: Option<String>,
    /// Custom literal set the actual draws from
    #[serde(default)]
    pub custom_literals: Option<String>,
}

fn default_cardinality() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortModel {
    #[serde(default)]
    pub windowing: WindowingMode,
    #[serde(default)]
    pub punctuation: PunctuationMode,
    /// Custom output function set for an output port
    #[serde(default)]
    pub output_functions: Option<String>,
}

/// Ordered ports; an open set repeats its last port
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSetModel {
    #[serde(default)]
    pub ports: Vec<PortModel>,
    #[serde(default)]
    pub open: bool,
}

impl PortSetModel {
    /// Port descriptor for the port at `index`
    pub fn port(&self, index: usize) -> Option<&PortModel> {
        match self.ports.get(index) {
            Some(port) => Some(port),
            None if self.open => self.ports.last(),
            None => None,
        }
    }

    /// Whether `count` ports fit this set
    pub fn accepts(&self, count: usize) -> bool {
        if self.open {
            count + 1 >= self.ports.len()
        } else {
            count == self.ports.len()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralSet {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFunctionSet {
    pub name: String,
    pub functions: Vec<String>,
}

/// Description of one primitive operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorModel {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub allow_any_parameters: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterModel>,
    #[serde(default)]
    pub input_ports: PortSetModel,
    #[serde(default)]
    pub output_ports: PortSetModel,
    #[serde(default)]
    pub custom_literals: Vec<LiteralSet>,
    #[serde(default)]
    pub output_functions: Vec<OutputFunctionSet>,
}

impl OperatorModel {
    /// Parse and check one model
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let model: OperatorModel = serde_json::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelError> {
        for (index, param) in self.parameters.iter().enumerate() {
            if self.parameters[..index].iter().any(|p| p.name == param.name) {
                return Err(ModelError::DuplicateParameter {
                    operator: self.full_name(),
                    name: param.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// `namespace::Name`
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }

    pub fn parameter(&self, name: &str) -> Option<(usize, &ParameterModel)> {
        self.parameters
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }

    /// The operator whose logic clauses may submit tuples
    pub fn is_custom(&self) -> bool {
        self.namespace == "spl.utility" && self.name == "Custom"
    }
}

/// Set of models the binder seeds primitive operators from
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<Arc<OperatorModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in standard toolkit
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for model in toolkit() {
            registry.add(model);
        }
        registry
    }

    /// Add a model, replacing one with the same full name
    pub fn add(&mut self, model: OperatorModel) {
        let full_name = model.full_name();
        self.models.retain(|m| m.full_name() != full_name);
        self.models.push(Arc::new(model));
    }

    /// Load a JSON document holding one model or an array of models
    pub fn load_json(&mut self, text: &str) -> Result<usize, ModelError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let models: Vec<OperatorModel> = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            vec![serde_json::from_value(value)?]
        };
        let count = models.len();
        for model in models {
            model.validate()?;
            self.add(model);
        }
        Ok(count)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<usize, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_json(&text)
    }

    pub fn get(&self, full_name: &str) -> Option<&Arc<OperatorModel>> {
        self.models.iter().find(|m| m.full_name() == full_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<OperatorModel>> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

// ============================================================================
// Built-in toolkit
// ============================================================================

fn param(name: &str, mode: ExpressionMode) -> ParameterModel {
    ParameterModel {
        name: name.to_string(),
        ty: None,
        cardinality: 1,
        optional: true,
        expression_mode: mode,
        port_scope: Vec::new(),
        custom_output_function: None,
        custom_literals: None,
    }
}

fn ports(count: usize, windowing: WindowingMode, open: bool) -> PortSetModel {
    PortSetModel {
        ports: (0..count)
            .map(|_| PortModel {
                windowing,
                ..PortModel::default()
            })
            .collect(),
        open,
    }
}

fn operator(namespace: &str, name: &str) -> OperatorModel {
    OperatorModel {
        name: name.to_string(),
        namespace: namespace.to_string(),
        allow_any_parameters: false,
        parameters: Vec::new(),
        input_ports: PortSetModel::default(),
        output_ports: PortSetModel::default(),
        custom_literals: Vec::new(),
        output_functions: Vec::new(),
    }
}

fn toolkit() -> Vec<OperatorModel> {
    use ExpressionMode::*;
    use WindowingMode::*;

    let aggregate_functions = OutputFunctionSet {
        name: "AggregateFunctions".into(),
        functions: [
            "Count", "CountAll", "CountDistinct", "Sum", "Average", "Max", "Min", "First",
            "Last", "Any", "Collect",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    };
    let data_format = LiteralSet {
        name: "DataFormat".into(),
        values: ["csv", "txt", "line", "bin", "block"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };

    let mut functor = operator("spl.relational", "Functor");
    functor.input_ports = ports(1, NonWindowed, false);
    functor.output_ports = ports(1, NonWindowed, true);
    functor.parameters = vec![param("filter", Expression)];

    let mut filter = operator("spl.relational", "Filter");
    filter.input_ports = ports(1, NonWindowed, false);
    filter.output_ports = ports(1, NonWindowed, true);
    filter.parameters = vec![param("filter", Expression)];

    let mut aggregate = operator("spl.relational", "Aggregate");
    aggregate.input_ports = ports(1, Windowed, false);
    aggregate.output_ports = ports(1, NonWindowed, false);
    aggregate.output_ports.ports[0].output_functions = Some("AggregateFunctions".into());
    aggregate.parameters = vec![
        param("groupBy", Attribute),
        param("partitionBy", Attribute),
        param("aggregateIncompleteWindows", Constant),
    ];
    aggregate.output_functions = vec![aggregate_functions];

    let mut join = operator("spl.relational", "Join");
    join.input_ports = ports(2, Windowed, false);
    join.output_ports = ports(1, NonWindowed, false);
    join.parameters = vec![
        param("match", Expression),
        param("equalityLHS", Attribute),
        param("equalityRHS", Attribute),
        param("partitionByLHS", Attribute),
        param("partitionByRHS", Attribute),
        ParameterModel {
            custom_literals: Some("JoinAlgorithm".into()),
            ..param("algorithm", CustomLiteral)
        },
    ];
    join.custom_literals = vec![LiteralSet {
        name: "JoinAlgorithm".into(),
        values: vec!["inner".into(), "leftOuter".into(), "rightOuter".into(), "outer".into()],
    }];

    let mut custom = operator("spl.utility", "Custom");
    custom.input_ports = ports(1, OptionallyWindowed, true);
    custom.input_ports.ports[0].punctuation = PunctuationMode::Aware;
    custom.output_ports = ports(1, NonWindowed, true);

    let mut beacon = operator("spl.utility", "Beacon");
    beacon.output_ports = ports(1, NonWindowed, false);
    beacon.parameters = vec![
        param("period", AttributeFree),
        param("iterations", AttributeFree),
        param("initDelay", AttributeFree),
    ];

    let mut split = operator("spl.utility", "Split");
    split.input_ports = ports(1, NonWindowed, false);
    split.output_ports = ports(1, NonWindowed, true);
    split.parameters = vec![param("index", Expression), param("file", Constant)];

    let mut file_source = operator("spl.adapter", "FileSource");
    file_source.output_ports = ports(1, NonWindowed, false);
    file_source.input_ports = ports(1, NonWindowed, true);
    file_source.parameters = vec![
        param("file", AttributeFree),
        ParameterModel {
            custom_literals: Some("DataFormat".into()),
            ..param("format", CustomLiteral)
        },
        param("hasHeaderLine", Constant),
    ];
    file_source.custom_literals = vec![data_format.clone()];

    let mut file_sink = operator("spl.adapter", "FileSink");
    file_sink.input_ports = ports(1, NonWindowed, false);
    file_sink.parameters = vec![
        param("file", AttributeFree),
        ParameterModel {
            custom_literals: Some("DataFormat".into()),
            ..param("format", CustomLiteral)
        },
        param("flush", Constant),
    ];
    file_sink.custom_literals = vec![data_format];

    vec![
        functor,
        filter,
        aggregate,
        join,
        custom,
        beacon,
        split,
        file_source,
        file_sink,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Toolkit ──

    #[test]
    fn test_builtin_toolkit() {
        let registry = ModelRegistry::builtin();
        assert_eq!(registry.len(), 9);
        let custom = registry.get("spl.utility::Custom").unwrap();
        assert!(custom.is_custom());
        assert!(!registry.get("spl.relational::Functor").unwrap().is_custom());
    }

    #[test]
    fn test_port_counts() {
        let registry = ModelRegistry::builtin();
        let join = registry.get("spl.relational::Join").unwrap();
        assert!(join.input_ports.accepts(2));
        assert!(!join.input_ports.accepts(1));

        let custom = registry.get("spl.utility::Custom").unwrap();
        assert!(custom.input_ports.accepts(0));
        assert!(custom.input_ports.accepts(3));

        let source = registry.get("spl.adapter::FileSource").unwrap();
        assert!(source.input_ports.accepts(0));
        assert!(source.input_ports.accepts(1));
    }

    // ── Loading ──

    #[test]
    fn test_load_json_array() {
        let mut registry = ModelRegistry::new();
        let count = registry
            .load_json(
                r#"[
                    { "name": "Throttle", "namespace": "spl.utility",
                      "parameters": [ { "name": "rate", "expressionMode": "attributeFree" } ],
                      "inputPorts": { "ports": [ {} ] },
                      "outputPorts": { "ports": [ {} ] } },
                    { "name": "Gate", "namespace": "spl.utility", "allowAnyParameters": true }
                ]"#,
            )
            .unwrap();
        assert_eq!(count, 2);
        let throttle = registry.get("spl.utility::Throttle").unwrap();
        let (index, rate) = throttle.parameter("rate").unwrap();
        assert_eq!(index, 0);
        assert_eq!(rate.expression_mode, ExpressionMode::AttributeFree);
        assert_eq!(rate.cardinality, 1);
        assert!(registry.get("spl.utility::Gate").unwrap().allow_any_parameters);
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = OperatorModel::from_json(
            r#"{ "name": "Bad", "namespace": "x",
                 "parameters": [ { "name": "p" }, { "name": "p" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateParameter { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let mut registry = ModelRegistry::new();
        let err = registry
            .load_file(Path::new("/nonexistent/operator.json"))
            .unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
