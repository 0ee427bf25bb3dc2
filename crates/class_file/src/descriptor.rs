//! Field and method descriptors (JVMS §4.3).

use std::{fmt, iter::Peekable, str::CharIndices};

use thiserror::Error;

const MAX_ARRAY_DIMENSIONS: usize = 255;
const MAX_PARAMETER_SLOTS: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("unexpected end of descriptor")]
    UnexpectedEnd,
    #[error("unexpected character {0:?} at {1}")]
    UnexpectedChar(char, usize),
    #[error("trailing characters at {0}")]
    TrailingCharacters(usize),
    #[error("invalid class name {0:?}")]
    InvalidClassName(String),
    #[error("more than 255 array dimensions")]
    TooManyDimensions,
    #[error("parameters take more than 255 slots")]
    TooManyParameters,
}

type Result<T, E = DescriptorError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'B' => BaseType::Byte,
            'C' => BaseType::Char,
            'D' => BaseType::Double,
            'F' => BaseType::Float,
            'I' => BaseType::Int,
            'J' => BaseType::Long,
            'S' => BaseType::Short,
            'Z' => BaseType::Boolean,
            _ => return None,
        })
    }

    fn as_char(self) -> char {
        match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Base(BaseType),
    Object(String),
    Array {
        dimensions: u8,
        component: Box<FieldType>,
    },
}

impl FieldType {
    /// Number of local variable slots a value of this type occupies.
    pub fn slots(&self) -> usize {
        match self {
            FieldType::Base(BaseType::Long) | FieldType::Base(BaseType::Double) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => write!(f, "{}", base.as_char()),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array {
                dimensions,
                component,
            } => {
                for _ in 0..*dimensions {
                    f.write_str("[")?;
                }
                write!(f, "{}", component)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    /// `None` for `void`.
    pub return_type: Option<FieldType>,
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for parameter in &self.parameters {
            write!(f, "{}", parameter)?;
        }
        f.write_str(")")?;
        match &self.return_type {
            Some(ty) => write!(f, "{}", ty),
            None => f.write_str("V"),
        }
    }
}

pub fn parse_field_descriptor(descriptor: &str) -> Result<FieldType> {
    let mut parser = Parser::new(descriptor);
    let ty = parser.parse_field_type()?;
    parser.expect_end()?;
    Ok(ty)
}

/// Parses the descriptor of a static method, whose parameters may use all
/// 255 local variable slots.
pub fn parse_method_descriptor(descriptor: &str) -> Result<MethodDescriptor> {
    parse_method(descriptor, 0)
}

/// Parses the descriptor of an instance method. The implicit `this` takes
/// one of the 255 slots.
pub fn parse_instance_method_descriptor(descriptor: &str) -> Result<MethodDescriptor> {
    parse_method(descriptor, 1)
}

fn parse_method(descriptor: &str, receiver_slots: usize) -> Result<MethodDescriptor> {
    let mut parser = Parser::new(descriptor);
    let method = parser.parse_method_descriptor(receiver_slots)?;
    parser.expect_end()?;
    Ok(method)
}

struct Parser<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    fn next(&mut self) -> Result<(usize, char)> {
        self.chars.next().ok_or(DescriptorError::UnexpectedEnd)
    }

    fn peek(&mut self) -> Result<char> {
        self.chars
            .peek()
            .map(|&(_, c)| c)
            .ok_or(DescriptorError::UnexpectedEnd)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.next()? {
            (_, c) if c == expected => Ok(()),
            (pos, c) => Err(DescriptorError::UnexpectedChar(c, pos)),
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.chars.peek() {
            None => Ok(()),
            Some(&(pos, _)) => Err(DescriptorError::TrailingCharacters(pos)),
        }
    }

    fn parse_method_descriptor(&mut self, receiver_slots: usize) -> Result<MethodDescriptor> {
        self.expect('(')?;

        let mut parameters = Vec::new();
        let mut slots = receiver_slots;
        while self.peek()? != ')' {
            let parameter = self.parse_field_type()?;
            slots += parameter.slots();
            parameters.push(parameter);
        }
        self.expect(')')?;

        if slots > MAX_PARAMETER_SLOTS {
            return Err(DescriptorError::TooManyParameters);
        }

        let return_type = if self.peek()? == 'V' {
            self.next()?;
            None
        } else {
            Some(self.parse_field_type()?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    fn parse_field_type(&mut self) -> Result<FieldType> {
        let mut dimensions = 0;
        while self.peek()? == '[' {
            self.next()?;
            dimensions += 1;
        }
        if dimensions > MAX_ARRAY_DIMENSIONS {
            return Err(DescriptorError::TooManyDimensions);
        }

        let component = match self.next()? {
            (_, 'L') => FieldType::Object(self.parse_class_name()?),
            (pos, c) => FieldType::Base(
                BaseType::from_char(c).ok_or(DescriptorError::UnexpectedChar(c, pos))?,
            ),
        };

        if dimensions == 0 {
            Ok(component)
        } else {
            Ok(FieldType::Array {
                dimensions: dimensions as u8,
                component: Box::new(component),
            })
        }
    }

    // The 'L' has been consumed; reads up to and including the ';'.
    fn parse_class_name(&mut self) -> Result<String> {
        let start = match self.chars.peek() {
            Some(&(pos, _)) => pos,
            None => return Err(DescriptorError::UnexpectedEnd),
        };

        loop {
            match self.next()? {
                (end, ';') => {
                    let name = &self.src[start..end];
                    let valid = !name.is_empty()
                        && name.split('/').all(|segment| {
                            !segment.is_empty() && !segment.contains(&['.', '['][..])
                        });
                    return if valid {
                        Ok(name.to_owned())
                    } else {
                        Err(DescriptorError::InvalidClassName(name.to_owned()))
                    };
                }
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod descriptor_tests {
    use super::*;

    #[test]
    fn it_should_parse_base_types() {
        assert_eq!(
            parse_field_descriptor("I").unwrap(),
            FieldType::Base(BaseType::Int)
        );
    }

    #[test]
    fn it_should_parse_object_arrays() {
        let ty = parse_field_descriptor("[[Ljava/lang/String;").unwrap();
        assert_eq!(
            ty,
            FieldType::Array {
                dimensions: 2,
                component: Box::new(FieldType::Object("java/lang/String".into())),
            }
        );
        assert_eq!(ty.to_string(), "[[Ljava/lang/String;");
    }

    #[test]
    fn it_should_parse_method_descriptors() {
        let method = parse_method_descriptor("(IJLjava/lang/Object;[D)V").unwrap();
        assert_eq!(method.parameters.len(), 4);
        assert_eq!(method.return_type, None);
        assert_eq!(method.to_string(), "(IJLjava/lang/Object;[D)V");

        let method = parse_method_descriptor("()Ljava/lang/String;").unwrap();
        assert!(method.parameters.is_empty());
        assert_eq!(
            method.return_type,
            Some(FieldType::Object("java/lang/String".into()))
        );
    }

    #[test]
    fn it_should_reject_void_fields() {
        assert_eq!(
            parse_field_descriptor("V"),
            Err(DescriptorError::UnexpectedChar('V', 0))
        );
        assert!(parse_method_descriptor("(V)V").is_err());
    }

    #[test]
    fn it_should_reject_trailing_characters() {
        assert_eq!(
            parse_field_descriptor("II"),
            Err(DescriptorError::TrailingCharacters(1))
        );
    }

    #[test]
    fn it_should_reject_unterminated_class_names() {
        assert_eq!(
            parse_field_descriptor("Ljava/lang/Object"),
            Err(DescriptorError::UnexpectedEnd)
        );
    }

    #[test]
    fn it_should_reject_dotted_class_names() {
        assert_eq!(
            parse_field_descriptor("Ljava.lang.Object;"),
            Err(DescriptorError::InvalidClassName("java.lang.Object".into()))
        );
        assert!(parse_field_descriptor("L;").is_err());
    }

    #[test]
    fn it_should_count_the_receiver_of_instance_methods() {
        // 127 longs and an int fill all 255 slots
        let descriptor = format!("({}I)V", "J".repeat(127));

        assert!(parse_method_descriptor(&descriptor).is_ok());
        assert_eq!(
            parse_instance_method_descriptor(&descriptor),
            Err(DescriptorError::TooManyParameters)
        );
        assert!(parse_instance_method_descriptor(&format!("({})V", "J".repeat(127))).is_ok());
    }

    #[test]
    fn it_should_count_wide_parameters_twice() {
        let descriptor = format!("({})V", "J".repeat(128));
        assert_eq!(
            parse_method_descriptor(&descriptor),
            Err(DescriptorError::TooManyParameters)
        );
    }
}
