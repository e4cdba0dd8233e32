use super::TypeRef;

/// Argument types plus a return type.
///
/// The name is rebuilt on every change as `ret^(a,ref b)` and serves as the
/// structural identity of the signature.
#[derive(Debug, Clone)]
pub struct FuncSignature {
    ret: TypeRef,
    args: Vec<TypeRef>,
    name: String,
}

impl FuncSignature {
    pub fn new(ret: TypeRef) -> Self {
        Self::with_args(ret, Vec::new())
    }

    pub fn with_args(ret: TypeRef, args: Vec<TypeRef>) -> Self {
        let mut sig = Self {
            ret,
            args,
            name: String::new(),
        };
        sig.update_name();
        sig
    }

    pub fn add_arg(&mut self, arg: TypeRef) {
        self.args.push(arg);
        self.update_name();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ret_type(&self) -> &TypeRef {
        &self.ret
    }

    pub fn arg_types(&self) -> &[TypeRef] {
        &self.args
    }

    pub fn args_num(&self) -> usize {
        self.args.len()
    }

    fn update_name(&mut self) {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                if a.is_ref() {
                    format!("ref {}", a.name())
                } else {
                    a.name().to_string()
                }
            })
            .collect();
        self.name = format!("{}^({})", self.ret.name(), args.join(","));
    }
}

/// An ordered group of types, used for multiple return values.
#[derive(Debug, Clone, Default)]
pub struct TupleType {
    items: Vec<TypeRef>,
    name: String,
}

impl TupleType {
    pub fn new(items: Vec<TypeRef>) -> Self {
        let mut tuple = Self {
            items,
            name: String::new(),
        };
        tuple.update_name();
        tuple
    }

    pub fn add(&mut self, item: TypeRef) {
        self.items.push(item);
        self.update_name();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&TypeRef> {
        self.items.get(idx)
    }

    pub fn items(&self) -> &[TypeRef] {
        &self.items
    }

    fn update_name(&mut self) {
        let names: Vec<&str> = self.items.iter().map(|i| i.name()).collect();
        self.name = names.join(",");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn test_signature_name_tracks_args() {
        let mut sig = FuncSignature::new(TypeRef::resolved("void", Type::VOID));
        assert_eq!(sig.name(), "void^()");
        sig.add_arg(TypeRef::resolved("int", Type::INT));
        sig.add_arg(TypeRef::resolved("float", Type::FLOAT).with_ref(true));
        assert_eq!(sig.name(), "void^(int,ref float)");
        assert_eq!(sig.args_num(), 2);
    }

    #[test]
    fn test_tuple_name_joins_items() {
        let mut tuple = TupleType::new(vec![TypeRef::resolved("int", Type::INT)]);
        tuple.add(TypeRef::resolved("string", Type::STRING));
        assert_eq!(tuple.name(), "int,string");
        assert_eq!(tuple.len(), 2);
        assert_eq!(tuple.get(1).map(|t| t.name()), Some("string"));
    }
}
