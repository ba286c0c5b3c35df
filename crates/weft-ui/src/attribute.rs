//! Attribute values and their sources
//!
//! An attribute on a descriptor is either a static value, a live binding to
//! observed data, or an event handler. Values convert to the host
//! representation through [`AttributeText`]:
//!
//! | Value             | Host effect                 |
//! |-------------------|-----------------------------|
//! | non-empty text    | attribute set to the text   |
//! | empty text        | attribute removed           |
//! | `true`            | attribute set to `""`       |
//! | `false` / `None`  | attribute removed           |
//! | number            | attribute set to its string |

use std::fmt;
use std::rc::Rc;

use weft_dom::DomEvent;
use weft_reactive::{Combinator, DependencyToken, Observed};

/// User callback for a host event
pub type EventHandler = Rc<dyn Fn(&DomEvent)>;

/// Value ready to be written to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    Flag(bool),
    Absent,
}

impl AttrValue {
    /// Text used when the value is written as text content
    pub fn to_text(&self) -> String {
        match self {
            AttrValue::Text(text) => text.clone(),
            AttrValue::Flag(flag) => flag.to_string(),
            AttrValue::Absent => String::new(),
        }
    }
}

/// Conversion of a Rust value to an attribute value
pub trait AttributeText {
    fn to_attr_value(&self) -> AttrValue;
}

impl AttributeText for String {
    fn to_attr_value(&self) -> AttrValue {
        AttrValue::Text(self.clone())
    }
}

impl AttributeText for &str {
    fn to_attr_value(&self) -> AttrValue {
        AttrValue::Text((*self).to_string())
    }
}

impl AttributeText for bool {
    fn to_attr_value(&self) -> AttrValue {
        AttrValue::Flag(*self)
    }
}

impl AttributeText for AttrValue {
    fn to_attr_value(&self) -> AttrValue {
        self.clone()
    }
}

impl<T: AttributeText> AttributeText for Option<T> {
    fn to_attr_value(&self) -> AttrValue {
        match self {
            Some(value) => value.to_attr_value(),
            None => AttrValue::Absent,
        }
    }
}

macro_rules! display_attribute_text {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AttributeText for $ty {
                fn to_attr_value(&self) -> AttrValue {
                    AttrValue::Text(self.to_string())
                }
            }
        )*
    };
}

display_attribute_text!(char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Where an attribute writes to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeName {
    /// Named host attribute, or event name for listeners
    Named(String),
    /// The element's text content
    TextContent,
}

impl AttributeName {
    /// Name that selects text content
    pub const TEXT_CONTENT: &'static str = "textContent";
}

impl From<&str> for AttributeName {
    fn from(name: &str) -> Self {
        if name == Self::TEXT_CONTENT {
            AttributeName::TextContent
        } else {
            AttributeName::Named(name.to_string())
        }
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeName::Named(name) => f.write_str(name),
            AttributeName::TextContent => f.write_str(Self::TEXT_CONTENT),
        }
    }
}

/// Live value an attribute binding reads from
pub trait BindingSource {
    /// Current value
    fn current(&self) -> AttrValue;

    /// Observed values whose change invalidates `current`
    fn dependencies(&self) -> DependencyToken;
}

impl<T: AttributeText + 'static> BindingSource for Observed<T> {
    fn current(&self) -> AttrValue {
        self.with(|value| value.to_attr_value())
    }

    fn dependencies(&self) -> DependencyToken {
        DependencyToken::from(self)
    }
}

impl<R: AttributeText + 'static> BindingSource for Combinator<R> {
    fn current(&self) -> AttrValue {
        self.evaluate().to_attr_value()
    }

    fn dependencies(&self) -> DependencyToken {
        self.token().clone()
    }
}

/// Origin of an attribute's value
#[derive(Clone)]
pub enum AttributeSource {
    Static(AttrValue),
    Bound(Rc<dyn BindingSource>),
    Listener(EventHandler),
}

impl fmt::Debug for AttributeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeSource::Static(value) => f.debug_tuple("Static").field(value).finish(),
            AttributeSource::Bound(source) => {
                f.debug_tuple("Bound").field(&source.current()).finish()
            }
            AttributeSource::Listener(_) => f.write_str("Listener"),
        }
    }
}

/// Attribute on an element descriptor
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: AttributeName,
    pub source: AttributeSource,
}

/// Anything usable as an attribute value in a descriptor
pub trait IntoAttributeSource {
    fn into_source(self) -> AttributeSource;
}

macro_rules! static_attribute_source {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoAttributeSource for $ty {
                fn into_source(self) -> AttributeSource {
                    AttributeSource::Static(self.to_attr_value())
                }
            }
        )*
    };
}

static_attribute_source!(
    String, &str, bool, AttrValue, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize,
    f32, f64,
);

impl<T: AttributeText> IntoAttributeSource for Option<T> {
    fn into_source(self) -> AttributeSource {
        AttributeSource::Static(self.to_attr_value())
    }
}

impl<T: AttributeText + 'static> IntoAttributeSource for Observed<T> {
    fn into_source(self) -> AttributeSource {
        AttributeSource::Bound(Rc::new(self))
    }
}

impl<T: AttributeText + 'static> IntoAttributeSource for &Observed<T> {
    fn into_source(self) -> AttributeSource {
        AttributeSource::Bound(Rc::new(self.clone()))
    }
}

impl<R: AttributeText + 'static> IntoAttributeSource for Combinator<R> {
    fn into_source(self) -> AttributeSource {
        AttributeSource::Bound(Rc::new(self))
    }
}

impl<R: AttributeText + 'static> IntoAttributeSource for &Combinator<R> {
    fn into_source(self) -> AttributeSource {
        AttributeSource::Bound(Rc::new(self.clone()))
    }
}
