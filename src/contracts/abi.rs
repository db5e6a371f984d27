use alloy::{
    dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier},
    json_abi::{Function, JsonAbi, Param, StateMutability},
    primitives::hex,
};
use serde_json::Value;

const ITEM_TYPES: &[&str] = &[
    "function",
    "constructor",
    "event",
    "error",
    "fallback",
    "receive",
];

/// Parse and validate an ABI JSON array.
pub fn parse_abi(abi_json: &Value) -> Result<JsonAbi, String> {
    let abi_array = abi_json
        .as_array()
        .ok_or_else(|| "ABI must be a JSON array".to_string())?;

    for (i, item) in abi_array.iter().enumerate() {
        let item_type = item
            .get("type")
            .and_then(|t| t.as_str())
            // Old compilers omit "type" on functions.
            .unwrap_or("function");

        if !ITEM_TYPES.contains(&item_type) {
            return Err(format!("ABI entry {} has unknown type {:?}", i, item_type));
        }
    }

    serde_json::from_value(abi_json.clone()).map_err(|e| format!("malformed ABI: {}", e))
}

/// Find a function by name, or by full signature such as `transfer(address,uint256)`.
/// Overloads are told apart by argument count.
pub fn find_function<'a>(abi: &'a JsonAbi, name: &str, arg_count: usize) -> Result<&'a Function, String> {
    if name.contains('(') {
        return abi
            .functions()
            .find(|f| f.signature() == name)
            .ok_or_else(|| format!("ABI has no function {}", name));
    }

    let overloads = abi
        .function(name)
        .ok_or_else(|| format!("ABI has no function named {}", name))?;

    match overloads.iter().find(|f| f.inputs.len() == arg_count) {
        Some(function) => Ok(function),
        None => Err(format!(
            "{} takes {} argument(s), got {}",
            name,
            overloads
                .iter()
                .map(|f| f.inputs.len().to_string())
                .collect::<Vec<_>>()
                .join(" or "),
            arg_count
        )),
    }
}

/// Coerce textual arguments into typed ABI values.
pub fn coerce_args(params: &[Param], args: &[String]) -> Result<Vec<DynSolValue>, String> {
    if params.len() != args.len() {
        return Err(format!(
            "expected {} argument(s), got {}",
            params.len(),
            args.len()
        ));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty: DynSolType = param
                .resolve()
                .map_err(|e| format!("unsupported parameter type {}: {}", param.ty, e))?;
            ty.coerce_str(arg).map_err(|e| {
                let label = if param.name.is_empty() { &param.ty } else { &param.name };
                format!("invalid value {:?} for {} ({}): {}", arg, label, param.ty, e)
            })
        })
        .collect()
}

/// ABI-encoded constructor arguments, to be appended to the creation bytecode.
pub fn encode_constructor_args(abi: &JsonAbi, args: &[String]) -> Result<Vec<u8>, String> {
    match &abi.constructor {
        Some(constructor) => {
            let values = coerce_args(&constructor.inputs, args)?;
            constructor
                .abi_encode_input(&values)
                .map_err(|e| e.to_string())
        }
        None if args.is_empty() => Ok(Vec::new()),
        None => Err(format!(
            "contract has no constructor but {} argument(s) were given",
            args.len()
        )),
    }
}

/// Selector-prefixed calldata for a function call.
pub fn encode_call(function: &Function, args: &[String]) -> Result<Vec<u8>, String> {
    let values = coerce_args(&function.inputs, args)?;
    function.abi_encode_input(&values).map_err(|e| e.to_string())
}

/// Decode a read call's return data into display strings.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<String>, String> {
    if function.outputs.is_empty() {
        return Ok(vec![]);
    }
    // An address without code answers every call with empty data.
    if data.is_empty() {
        return Err(format!(
            "{} returned no data; is there a contract at this address?",
            function.name
        ));
    }

    let values = function
        .abi_decode_output(data)
        .map_err(|e| format!("cannot decode {} output: {}", function.name, e))?;

    Ok(values.iter().map(format_value).collect())
}

pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(addr) => addr.to_checksum(None),
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        DynSolValue::Bytes(bytes) => hex::encode_prefixed(bytes),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Function(f) => hex::encode_prefixed(f.as_slice()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", inner.join(", "))
        }
        DynSolValue::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(format_value).collect();
            format!("({})", inner.join(", "))
        }
        #[allow(unreachable_patterns)]
        other => format!("{:?}", other),
    }
}

/// Determine if a function is a read or write operation
pub fn is_read_only(function: &Function) -> bool {
    matches!(
        function.state_mutability,
        StateMutability::View | StateMutability::Pure
    )
}
