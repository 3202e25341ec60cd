#[macro_export]
macro_rules! define_function {
    ($func_key:ident => {
        name: $fn_name:expr,
        documentation: $doc:expr,
        example: $example:expr,
        inputs: [$($input_name:ident: { documentation: $input_doc:expr $(, optional: $input_opt:expr)? }),*],
        output: { documentation: $output_doc:expr },
        $(variadic: $variadic:expr,)?
    }) => {
        $crate::types::functions::FunctionSpecification {
            name: String::from($fn_name),
            documentation: String::from($doc),
            inputs: vec![$($crate::types::functions::FunctionInput {
                name: String::from(stringify!($input_name)),
                documentation: String::from($input_doc),
                optional: {
                    let mut is_optional = false;
                    $(
                        is_optional = $input_opt;
                    )?
                    is_optional
                },
            }),*],
            output: $crate::types::functions::FunctionOutput {
                documentation: String::from($output_doc),
            },
            variadic: {
                let mut is_variadic = false;
                $(
                    is_variadic = $variadic;
                )?
                is_variadic
            },
            example: String::from($example),
            runner: $func_key::run,
        }
    };
}
