use serde_json::Value as JsonValue;
use std::borrow::Cow;

/// Description that marks a schema node as a secret.
const SECRET_DESCRIPTION: &str = "secret";

/// Declarative description of a tool configuration shape. Used to locate secret fields in
/// configuration instances without knowing their concrete Rust types.
#[derive(Debug, Clone)]
pub struct ConfigSchema {
    pub kind: SchemaKind,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SchemaKind {
    String,
    Number,
    Boolean,
    Literal(JsonValue),
    Any,
    /// Object with named fields, in declaration order.
    Object(Vec<(String, ConfigSchema)>),
    Union(Vec<ConfigSchema>),
    DiscriminatedUnion {
        discriminator: String,
        variants: Vec<ConfigSchema>,
    },
    Array(Box<ConfigSchema>),
    /// Object with arbitrary keys and values of the same shape.
    Record(Box<ConfigSchema>),
    Optional(Box<ConfigSchema>),
    Nullable(Box<ConfigSchema>),
    Default(Box<ConfigSchema>, JsonValue),
    /// Recursive schemas are defined lazily.
    Lazy(fn() -> ConfigSchema),
    /// Transformation pipeline, only the output side describes the resulting value.
    Pipe {
        input: Box<ConfigSchema>,
        output: Box<ConfigSchema>,
    },
}

impl ConfigSchema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    pub fn number() -> Self {
        Self::new(SchemaKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn literal(value: impl Into<JsonValue>) -> Self {
        Self::new(SchemaKind::Literal(value.into()))
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn object<N: Into<String>>(fields: impl IntoIterator<Item = (N, ConfigSchema)>) -> Self {
        Self::new(SchemaKind::Object(
            fields
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
        ))
    }

    pub fn union(variants: impl IntoIterator<Item = ConfigSchema>) -> Self {
        Self::new(SchemaKind::Union(variants.into_iter().collect()))
    }

    pub fn discriminated_union(
        discriminator: impl Into<String>,
        variants: impl IntoIterator<Item = ConfigSchema>,
    ) -> Self {
        Self::new(SchemaKind::DiscriminatedUnion {
            discriminator: discriminator.into(),
            variants: variants.into_iter().collect(),
        })
    }

    pub fn array(element: ConfigSchema) -> Self {
        Self::new(SchemaKind::Array(Box::new(element)))
    }

    pub fn record(value: ConfigSchema) -> Self {
        Self::new(SchemaKind::Record(Box::new(value)))
    }

    pub fn lazy(factory: fn() -> ConfigSchema) -> Self {
        Self::new(SchemaKind::Lazy(factory))
    }

    pub fn pipe(input: ConfigSchema, output: ConfigSchema) -> Self {
        Self::new(SchemaKind::Pipe {
            input: Box::new(input),
            output: Box::new(output),
        })
    }

    pub fn optional(self) -> Self {
        Self::new(SchemaKind::Optional(Box::new(self)))
    }

    pub fn nullable(self) -> Self {
        Self::new(SchemaKind::Nullable(Box::new(self)))
    }

    pub fn with_default(self, value: impl Into<JsonValue>) -> Self {
        Self::new(SchemaKind::Default(Box::new(self), value.into()))
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the node as a secret.
    pub fn secret(self) -> Self {
        self.describe(SECRET_DESCRIPTION)
    }

    /// Returns `true` if this exact node is marked as a secret, wrappers aren't inspected.
    pub fn is_secret(&self) -> bool {
        self.description.as_deref() == Some(SECRET_DESCRIPTION)
    }

    /// Peels off all wrapper layers (optional, nullable, default, lazy, pipe output) and returns
    /// the innermost schema along with a flag indicating whether any layer on the way, including
    /// the innermost one, is marked as a secret.
    pub fn unwrap_layers(&self) -> (Cow<'_, ConfigSchema>, bool) {
        let mut is_secret = self.is_secret();
        let mut current = Cow::Borrowed(self);
        loop {
            let next = match current {
                Cow::Borrowed(schema) => Self::inner(schema),
                Cow::Owned(ref schema) => {
                    Self::inner(schema).map(|inner| Cow::Owned(inner.into_owned()))
                }
            };

            match next {
                Some(next) => {
                    is_secret |= next.is_secret();
                    current = next;
                }
                None => return (current, is_secret),
            }
        }
    }

    fn inner(schema: &ConfigSchema) -> Option<Cow<'_, ConfigSchema>> {
        match &schema.kind {
            SchemaKind::Optional(inner)
            | SchemaKind::Nullable(inner)
            | SchemaKind::Default(inner, _) => Some(Cow::Borrowed(inner.as_ref())),
            SchemaKind::Pipe { output, .. } => Some(Cow::Borrowed(output.as_ref())),
            SchemaKind::Lazy(factory) => Some(Cow::Owned(factory())),
            _ => None,
        }
    }
}
