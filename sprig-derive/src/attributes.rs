use syn::spanned::Spanned;
use syn::{Attribute, Error, ExprPath, LitStr, Meta};

pub const CONTROLLER: &str = "controller";
pub const SERVICE: &str = "service";
pub const COMPONENT: &str = "component";
pub const REQUEST_MAPPING: &str = "request_mapping";
pub const AUTOWIRED: &str = "autowired";
pub const BEAN: &str = "bean";

fn parse_name(value: &Attribute) -> Result<Option<LitStr>, Error> {
    // bare markers carry no arguments
    if let Meta::Path(_) = value.meta {
        return Ok(None);
    }

    let mut name = None;
    value.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value().and_then(|value| value.parse())?);
            Ok(())
        } else {
            Err(meta.error("Unsupported attribute - expected `name`!"))
        }
    })?;

    Ok(name)
}

/// `#[controller]`, `#[service]` or `#[component]`, with an optional `name = "..."`.
pub struct RoleAttributes {
    pub name: Option<LitStr>,
}

impl TryFrom<&Attribute> for RoleAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        Ok(Self {
            name: parse_name(value)?,
        })
    }
}

/// `#[autowired]` with an optional `name = "..."`.
pub struct AutowiredAttributes {
    pub name: Option<LitStr>,
}

impl TryFrom<&Attribute> for AutowiredAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        Ok(Self {
            name: parse_name(value)?,
        })
    }
}

/// `#[request_mapping("/path")]`. A bare marker maps to an empty path.
pub struct RequestMappingAttributes {
    pub path: LitStr,
}

impl TryFrom<&Attribute> for RequestMappingAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let path = match value.meta {
            Meta::Path(_) => LitStr::new("", value.span()),
            _ => value.parse_args()?,
        };

        Ok(Self { path })
    }
}

/// `#[bean(constructor = "path::to::function")]`.
pub struct BeanAttributes {
    pub constructor: Option<ExprPath>,
}

impl TryFrom<&Attribute> for BeanAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut constructor = None;
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("constructor") {
                let path: LitStr = meta.value()?.parse()?;
                constructor = Some(path.parse()?);
                Ok(())
            } else {
                Err(meta.error("Unsupported attribute - expected `constructor`!"))
            }
        })?;

        Ok(Self { constructor })
    }
}
