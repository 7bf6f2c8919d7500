use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{FnArg, GenericArgument, ItemFn, Pat, PathArguments, Type, parse_macro_input};

/// Derive a `TemplateFilter` implementation from a function.
///
/// The first parameter receives the piped value. An optional second
/// parameter receives the filter argument; declare it as `Option<T>` to
/// make the argument optional. A function with one parameter takes no
/// argument. The generated struct is named after the function in
/// PascalCase with a `Filter` suffix.
///
/// # Attribute syntax
///
/// ```ignore
/// #[template_filter(name = "truncate")]
/// ```
///
/// # Supported parameter types
/// - `Value`: accepts any value, no validation
/// - `String`: validates the value is a string, passes the inner String
/// - `f64`: validates the value is a number, passes the inner f64
/// - `bool`: validates the value is a bool, passes the inner bool
/// - `Vec<Value>`: validates the value is an array, passes the inner Vec
///
/// # Example
/// ```ignore
/// #[template_filter(name = "truncate")]
/// fn truncate(text: String, len: f64) -> Result<Value, RenderError> {
///     Ok(Value::String(text.chars().take(len as usize).collect()))
/// }
///
/// registry.register_filter(TruncateFilter);
/// ```
#[proc_macro_attribute]
pub fn template_filter(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as FilterArgs);
    let input_fn = parse_macro_input!(item as ItemFn);

    match expand_filter(&args, &input_fn) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_filter(args: &FilterArgs, input_fn: &ItemFn) -> syn::Result<TokenStream2> {
    let fn_name = &input_fn.sig.ident;
    let struct_name = format_ident!("{}Filter", to_pascal_case(&fn_name.to_string()));
    let filter_name = &args.name;

    let params = input_fn
        .sig
        .inputs
        .iter()
        .map(|fn_arg| match fn_arg {
            FnArg::Typed(pat_type) => match &*pat_type.pat {
                Pat::Ident(ident) => Ok((&ident.ident, &*pat_type.ty)),
                other => Err(syn::Error::new_spanned(other, "expected a plain parameter name")),
            },
            FnArg::Receiver(receiver) => {
                Err(syn::Error::new_spanned(receiver, "a filter cannot take `self`"))
            }
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let ((value_name, value_ty), arg_param) = match params.as_slice() {
        [value] => (*value, None),
        [value, arg] => (*value, Some(*arg)),
        _ => {
            return Err(syn::Error::new_spanned(
                &input_fn.sig.inputs,
                "a filter takes the piped value and at most one argument",
            ));
        }
    };

    let (value_conversion, value_rust_ty) =
        generate_extraction(quote! { __tapestry_value }, value_ty);
    let mut param_names = vec![value_name.clone()];
    let mut param_types = vec![value_rust_ty];

    let (arg_binding, arg_spec) = match arg_param {
        None => (
            quote! { let _ = __tapestry_arg; },
            quote! { tapestry::registry::ArgSpec::None },
        ),
        Some((arg_name, arg_ty)) => {
            param_names.push(arg_name.clone());
            match option_inner(arg_ty) {
                Some(inner) => {
                    let (conversion, rust_ty) = generate_extraction(quote! { __tapestry_present }, inner);
                    param_types.push(quote! { Option<#rust_ty> });
                    (
                        quote! {
                            let #arg_name = match __tapestry_arg {
                                Some(__tapestry_present) => Some(#conversion),
                                None => None,
                            };
                        },
                        quote! { tapestry::registry::ArgSpec::Optional },
                    )
                }
                None => {
                    let (conversion, rust_ty) = generate_extraction(quote! { __tapestry_present }, arg_ty);
                    param_types.push(rust_ty);
                    (
                        quote! {
                            let #arg_name = match __tapestry_arg {
                                Some(__tapestry_present) => #conversion,
                                None => return Err(tapestry::RenderError::filter_argument(
                                    #filter_name,
                                    "requires an argument",
                                )),
                            };
                        },
                        quote! { tapestry::registry::ArgSpec::Required },
                    )
                }
            }
        }
    };

    let output_ty = &input_fn.sig.output;
    let fn_body = &input_fn.block;
    let vis = &input_fn.vis;

    Ok(quote! {
        #vis struct #struct_name;

        impl #struct_name {
            fn execute(#(#param_names: #param_types),*) #output_ty #fn_body
        }

        impl tapestry::TemplateFilter for #struct_name {
            fn apply(
                &self,
                __tapestry_value: tapestry::Value,
                __tapestry_arg: Option<tapestry::Value>,
            ) -> Result<tapestry::Value, tapestry::RenderError> {
                let #value_name = #value_conversion;
                #arg_binding
                Self::execute(#(#param_names),*)
            }

            fn signature(&self) -> tapestry::registry::FilterSignature {
                tapestry::registry::FilterSignature {
                    name: #filter_name.to_string(),
                    arg: #arg_spec,
                }
            }
        }
    })
}

/// Returns (conversion_expression, rust_type_token) for reading `source`,
/// an expression of type `Value`, as `ty`.
fn generate_extraction(source: TokenStream2, ty: &Type) -> (TokenStream2, TokenStream2) {
    let type_str = quote!(#ty).to_string().replace(' ', "");

    match type_str.as_str() {
        "String" => (
            quote! {
                match #source {
                    tapestry::Value::String(s) => s,
                    other => return Err(tapestry::RenderError::type_error("string", other.type_name())),
                }
            },
            quote! { String },
        ),
        "f64" => (
            quote! {
                match #source {
                    tapestry::Value::Number(n) => n,
                    other => return Err(tapestry::RenderError::type_error("number", other.type_name())),
                }
            },
            quote! { f64 },
        ),
        "bool" => (
            quote! {
                match #source {
                    tapestry::Value::Bool(b) => b,
                    other => return Err(tapestry::RenderError::type_error("bool", other.type_name())),
                }
            },
            quote! { bool },
        ),
        "Vec<Value>" => (
            quote! {
                match #source {
                    tapestry::Value::Array(items) => items,
                    other => return Err(tapestry::RenderError::type_error("array", other.type_name())),
                }
            },
            quote! { Vec<tapestry::Value> },
        ),
        // `Value` and anything unrecognized pass through untouched.
        _ => (quote! { #source }, quote! { tapestry::Value }),
    }
}

/// `Some(T)` for a type written as `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return None;
    };
    match generics.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

// -- Attribute arg parsing -----------------------------------------------

struct FilterArgs {
    name: String,
}

impl syn::parse::Parse for FilterArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let ident: syn::Ident = input.parse()?;
        if ident != "name" {
            return Err(syn::Error::new(ident.span(), "expected `name`"));
        }
        input.parse::<syn::Token![=]>()?;
        let lit: syn::LitStr = input.parse()?;
        if !input.is_empty() {
            input.parse::<syn::Token![,]>()?;
        }
        if !input.is_empty() {
            return Err(input.error("unexpected input after `name`"));
        }
        Ok(FilterArgs { name: lit.value() })
    }
}
