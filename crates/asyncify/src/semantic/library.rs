//! External library descriptions.
//!
//! Types that are referenced but not declared in the analyzed tree are
//! described here: their assembly, generic parameters, methods and
//! properties. [`Library::standard`] covers the handle type, its awaiter and
//! a few platform I/O types that have asynchronous siblings.

use crate::error::AsyncifyResult;
use crate::syntax::{Param, TypeRef};
use serde::{Deserialize, Serialize};

/// Set of external types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Name of the awaitable handle type
    #[serde(default = "default_handle")]
    pub handle_type: String,
    /// Described types
    #[serde(default)]
    pub types: Vec<ExternalType>,
}

fn default_handle() -> String {
    "Task".to_string()
}

impl Default for Library {
    fn default() -> Self {
        Self {
            handle_type: default_handle(),
            types: Vec::new(),
        }
    }
}

/// External type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalType {
    /// Type name
    pub name: String,
    /// Defining assembly
    pub assembly: String,
    /// Generic parameter names, substituted by receiver arguments
    #[serde(default)]
    pub generics: Vec<String>,
    /// Methods
    #[serde(default)]
    pub methods: Vec<ExternalMethod>,
    /// Properties
    #[serde(default)]
    pub properties: Vec<ExternalProperty>,
}

/// External method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMethod {
    /// Method name
    pub name: String,
    /// Return type
    #[serde(default)]
    pub return_type: TypeRef,
    /// Parameters
    #[serde(default)]
    pub params: Vec<Param>,
    /// Declared `async`
    #[serde(default)]
    pub is_async: bool,
    /// Overridable
    #[serde(default)]
    pub is_virtual: bool,
    /// Abstract
    #[serde(default)]
    pub is_abstract: bool,
    /// Static
    #[serde(default)]
    pub is_static: bool,
}

/// External property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProperty {
    /// Property name
    pub name: String,
    /// Property type
    pub ty: TypeRef,
}

impl ExternalType {
    /// Type without members.
    #[must_use]
    pub fn new(name: impl Into<String>, assembly: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assembly: assembly.into(),
            generics: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Add a generic parameter.
    #[must_use]
    pub fn generic(mut self, name: impl Into<String>) -> Self {
        self.generics.push(name.into());
        self
    }

    /// Add a method.
    #[must_use]
    pub fn method(mut self, method: ExternalMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.properties.push(ExternalProperty {
            name: name.into(),
            ty,
        });
        self
    }

    /// Property by name.
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&ExternalProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl ExternalMethod {
    /// Instance method.
    #[must_use]
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            return_type,
            params: Vec::new(),
            is_async: false,
            is_virtual: false,
            is_abstract: false,
            is_static: false,
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Mark static.
    #[must_use]
    pub const fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark virtual.
    #[must_use]
    pub const fn virtual_(mut self) -> Self {
        self.is_virtual = true;
        self
    }
}

impl Library {
    /// Empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON library description.
    pub fn from_json_str(json: &str) -> AsyncifyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a type.
    #[must_use]
    pub fn with_type(mut self, ty: ExternalType) -> Self {
        self.types.push(ty);
        self
    }

    /// Append all types of `other`; existing names win.
    pub fn merge(&mut self, other: Self) {
        for ty in other.types {
            if self.find_type(&ty.name).is_none() {
                self.types.push(ty);
            }
        }
    }

    /// Type by name.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<&ExternalType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Handle type, its awaiter and common platform I/O types.
    #[must_use]
    pub fn standard() -> Self {
        let int = || TypeRef::named("int");
        let buffer = || TypeRef::generic("Array", vec![TypeRef::named("byte")]);
        let string = || TypeRef::named("string");
        let ct = || {
            Param::new("cancellationToken", TypeRef::named("CancellationToken"))
                .with_default("default(CancellationToken)")
        };
        let task_of = |t: TypeRef| TypeRef::generic("Task", vec![t]);
        let io_params = |m: ExternalMethod| {
            m.param(Param::new("buffer", buffer()))
                .param(Param::new("offset", int()))
                .param(Param::new("count", int()))
        };

        let task = ExternalType::new("Task", "System.Runtime")
            .generic("TResult")
            .property("Result", TypeRef::named("TResult"))
            .method(ExternalMethod::new("Wait", TypeRef::void()))
            .method(ExternalMethod::new(
                "GetAwaiter",
                TypeRef::generic("TaskAwaiter", vec![TypeRef::named("TResult")]),
            ))
            .method(
                ExternalMethod::new("FromResult", task_of(TypeRef::named("TResult")))
                    .param(Param::new("result", TypeRef::named("TResult")))
                    .static_(),
            )
            .method(
                ExternalMethod::new("Delay", TypeRef::named("Task"))
                    .param(Param::new("millisecondsDelay", int()))
                    .static_(),
            )
            .method(
                ExternalMethod::new("Run", TypeRef::named("Task"))
                    .param(Param::new("action", TypeRef::named("Action")))
                    .static_(),
            );

        let object = ExternalType::new("Object", "System.Runtime")
            .method(ExternalMethod::new("ToString", string()))
            .method(
                ExternalMethod::new("Equals", TypeRef::named("bool"))
                    .param(Param::new("obj", TypeRef::named("Object")))
                    .virtual_(),
            );

        let awaiter = ExternalType::new("TaskAwaiter", "System.Runtime")
            .generic("TResult")
            .method(ExternalMethod::new("GetResult", TypeRef::named("TResult")));

        let stream = ExternalType::new("Stream", "System.IO")
            .method(io_params(ExternalMethod::new("Read", int())))
            .method(io_params(ExternalMethod::new("ReadAsync", task_of(int()))).param(ct()))
            .method(io_params(ExternalMethod::new("Write", TypeRef::void())))
            .method(
                io_params(ExternalMethod::new("WriteAsync", TypeRef::named("Task"))).param(ct()),
            )
            .method(ExternalMethod::new("Flush", TypeRef::void()))
            .method(ExternalMethod::new("FlushAsync", TypeRef::named("Task")).virtual_());

        let reader = ExternalType::new("StreamReader", "System.IO")
            .method(ExternalMethod::new("ReadToEnd", string()))
            .method(ExternalMethod::new("ReadToEndAsync", task_of(string())))
            .method(ExternalMethod::new("ReadLine", string()))
            .method(ExternalMethod::new("ReadLineAsync", task_of(string())))
            .method(ExternalMethod::new("ReadLineAsync", task_of(string())).param(ct()));

        let file = ExternalType::new("File", "System.IO")
            .method(
                ExternalMethod::new("ReadAllText", string())
                    .param(Param::new("path", string()))
                    .static_(),
            )
            .method(
                ExternalMethod::new("ReadAllTextAsync", task_of(string()))
                    .param(Param::new("path", string()))
                    .param(ct())
                    .static_(),
            );

        let thread = ExternalType::new("Thread", "System.Threading").method(
            ExternalMethod::new("Sleep", TypeRef::void())
                .param(Param::new("millisecondsTimeout", int()))
                .static_(),
        );

        Self::new()
            .with_type(task)
            .with_type(awaiter)
            .with_type(ExternalType::new("CancellationToken", "System.Runtime"))
            .with_type(object)
            .with_type(stream)
            .with_type(reader)
            .with_type(file)
            .with_type(thread)
    }
}

/// Replace generic parameter names in `ty` with the receiver's arguments.
pub(crate) fn substitute(ty: &TypeRef, generics: &[String], args: &[TypeRef]) -> TypeRef {
    match ty {
        TypeRef::Void => TypeRef::Void,
        TypeRef::Named { name, args: inner } => {
            if inner.is_empty() {
                if let Some(arg) = generics
                    .iter()
                    .position(|g| g == name)
                    .and_then(|i| args.get(i))
                {
                    return arg.clone();
                }
            }
            TypeRef::Named {
                name: name.clone(),
                args: inner
                    .iter()
                    .map(|a| substitute(a, generics, args))
                    .collect(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn standard_library_has_handle() {
        let lib = Library::standard();
        let task = lib.find_type("Task").unwrap();
        assert_eq!(task.assembly, "System.Runtime");
        assert!(task.find_property("Result").is_some());
        assert!(lib.find_type("Stream").unwrap().methods.len() >= 4);
    }

    #[test]
    fn substitute_generic_params() {
        let generics = vec!["TResult".to_string()];
        let args = vec![TypeRef::named("int")];
        let ty = TypeRef::generic("TaskAwaiter", vec![TypeRef::named("TResult")]);
        assert_eq!(
            substitute(&ty, &generics, &args),
            TypeRef::generic("TaskAwaiter", vec![TypeRef::named("int")])
        );
        // unbound parameters stay as written
        assert_eq!(
            substitute(&TypeRef::named("TResult"), &generics, &[]),
            TypeRef::named("TResult")
        );
    }

    #[test]
    fn json_roundtrip_and_defaults() {
        let lib = Library::from_json_str(
            r#"{"types":[{"name":"Socket","assembly":"System.Net","methods":[{"name":"Send"}]}]}"#,
        )
        .unwrap();
        assert_eq!(lib.handle_type, "Task");
        let socket = lib.find_type("Socket").unwrap();
        assert!(socket.methods[0].return_type.is_void());
    }

    #[test]
    fn merge_keeps_existing() {
        let mut lib = Library::new().with_type(ExternalType::new("Stream", "Custom"));
        lib.merge(Library::standard());
        assert_eq!(lib.find_type("Stream").unwrap().assembly, "Custom");
        assert!(lib.find_type("Task").is_some());
    }
}
