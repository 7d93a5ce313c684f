use crate::vm::class::field::{FieldType, MAX_ARRAY_DIMENSIONS};
use crate::vm::class::method::MethodDescriptor;

impl MethodDescriptor {
    fn parse_field_type(str: &str, is_parameter: bool) -> (Option<FieldType>, &str) {
        Self::parse_field_type_at_depth(str, is_parameter, 0)
    }

    fn parse_field_type_at_depth(str: &str, is_parameter: bool, depth: usize) -> (Option<FieldType>, &str) {
        if str.is_empty() || !str.is_char_boundary(1) {
            return (None, str);
        }

        match &str[0..1] {
            "B" => (Some(FieldType::B), &str[1..]),
            "C" => (Some(FieldType::C), &str[1..]),
            "D" => (Some(FieldType::D), &str[1..]),
            "F" => (Some(FieldType::F), &str[1..]),
            "I" => (Some(FieldType::I), &str[1..]),
            "J" => (Some(FieldType::J), &str[1..]),
            "L" => {
                let end = str.find(|c: char| c == ';' || c == ')');
                match end {
                    Some(end) if end > 1 && &str[end..end+1] == ";" =>
                        (Some(FieldType::L(str[1..end].to_string())), &str[end+1..]),
                    _ => (None, str)
                }
            },
            "S" => (Some(FieldType::S), &str[1..]),
            "Z" => (Some(FieldType::Z), &str[1..]),
            "[" => {
                if depth == MAX_ARRAY_DIMENSIONS {
                    return (None, str);
                }
                match Self::parse_field_type_at_depth(&str[1..], true, depth + 1) {
                    (Some(component), rest) => (Some(FieldType::A(Box::new(component))), rest),
                    _ => (None, str)
                }
            },
            "V" =>  if is_parameter {
                        (None, str)
                    } else {
                        (Some(FieldType::V), &str[1..])
                    }
            _ => (None, str)
        }
    }

    pub fn parse(mut str: &str) -> Option<Self> {
        str = str.strip_prefix('(')?;

        let mut parameters = vec![];
        while let (Some(arg), rest) = Self::parse_field_type(str, true) {
            parameters.push(arg);
            str = rest;
        }

        str = str.strip_prefix(')')?;

        match Self::parse_field_type(str, false) {
            (Some(ret), rest) if rest.is_empty() => Some(MethodDescriptor {
                parameters,
                ret,
            }),
            _ => None
        }
    }
}

impl FieldType {
    /// Parses a complete field descriptor. Trailing characters are rejected.
    pub fn parse(str: &str) -> Option<Self> {
        match MethodDescriptor::parse_field_type(str, true) {
            (Some(t), rest) if rest.is_empty() => Some(t),
            _ => None
        }
    }

    /// Like `parse`, but also accepts `V`
    pub fn parse_return(str: &str) -> Option<Self> {
        match MethodDescriptor::parse_field_type(str, false) {
            (Some(t), rest) if rest.is_empty() => Some(t),
            _ => None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::vm::class::field::FieldType;
    use crate::vm::class::field::FieldType::*;
    use crate::vm::class::method::MethodDescriptor;

    #[test]
    fn parse_method_descriptor() {
        assert_eq!(MethodDescriptor::parse("()V"), Some(MethodDescriptor { parameters: vec![],
            ret: V }));

        assert_eq!(MethodDescriptor::parse("()[Ljava/lang/String;"), Some(MethodDescriptor { parameters: vec![],
            ret: A(Box::from(L(String::from("java/lang/String")))) }));

        assert_eq!(MethodDescriptor::parse("(IV)I"), None);
        assert_eq!(MethodDescriptor::parse("(I)I "), None);
        assert_eq!(MethodDescriptor::parse("(L;)V"), None);
        assert_eq!(MethodDescriptor::parse(""), None);
        assert_eq!(MethodDescriptor::parse("(IJ[[Ljava/lang/String;)I"),
                   Some(MethodDescriptor {
                       parameters: vec![I, J, A(Box::new(A(Box::new(L(
                           String::from("java/lang/String"))))))],
                       ret: I
                   }));
    }

    #[test]
    fn descriptor_round_trip() {
        for d in ["()V", "(ZBCSIJFD)V", "([[I[Ljava/lang/Object;)Ljava/lang/String;"] {
            assert_eq!(MethodDescriptor::parse(d).unwrap().to_string(), d);
        }
    }

    #[test]
    fn array_dimension_limit() {
        let max = format!("{}I", "[".repeat(255));
        assert_eq!(FieldType::parse(&max).map(|t| t.dimensions()), Some(255));

        let too_deep = format!("{}I", "[".repeat(256));
        assert_eq!(FieldType::parse(&too_deep), None);
        assert_eq!(FieldType::parse("V"), None);
        assert_eq!(FieldType::parse("II"), None);
    }
}
