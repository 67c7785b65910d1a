//! Tool Definition Macros
//!
//! Cuts the boilerplate of declaring descriptors for hand-written tools

/// Declare a [`ToolDescriptor`](crate::tools::ToolDescriptor)
///
/// # Example
/// ```
/// use apibridge::tool_descriptor;
///
/// let descriptor = tool_descriptor! {
///     name: "scanInvoice",
///     description: "Extract data from an invoice image",
///     parameters: [
///         {
///             name: "filePath",
///             type: String,
///             description: "Path of the uploaded invoice",
///             required: true
///         }
///     ]
/// };
/// assert_eq!(descriptor.parameters.required, vec!["filePath".to_string()]);
/// ```
#[macro_export]
macro_rules! tool_descriptor {
    (
        name: $name:expr,
        description: $description:expr,
        parameters: [
            $(
                {
                    name: $param_name:expr,
                    type: $param_type:ident,
                    description: $param_desc:expr,
                    required: $param_required:expr
                }
            ),* $(,)?
        ]
    ) => {{
        #[allow(unused_mut)]
        let mut parameters = $crate::tools::ArgumentSchema::default();
        $(
            parameters.properties.insert(
                $param_name.to_string(),
                $crate::tool_descriptor!(@arg $param_type, $param_desc),
            );
            if $param_required {
                parameters.required.push($param_name.to_string());
            }
        )*
        $crate::tools::ToolDescriptor {
            name: $name.to_string(),
            description: $description.to_string(),
            parameters,
        }
    }};

    (@arg Object, $desc:expr) => {
        $crate::tools::ArgumentType::Object {
            description: Some($desc.to_string()),
            properties: ::std::default::Default::default(),
            required: Vec::new(),
        }
    };
    (@arg $variant:ident, $desc:expr) => {
        $crate::tools::ArgumentType::$variant {
            description: Some($desc.to_string()),
        }
    };
}

/// Fetch a required string argument or fail with `MissingArgument`
#[macro_export]
macro_rules! required_string_argument {
    ($args:expr, $param:expr) => {
        $args
            .get($param)
            .and_then(|value| value.as_str())
            .ok_or_else(|| $crate::error::ToolError::MissingArgument {
                name: $param.to_string(),
            })?
    };
}
