use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, punctuated::Punctuated, spanned::Spanned, token::Comma, Data,
    DeriveInput, Field, Fields, Ident, LitStr,
};

/// Implements `crate::output::TableOutputRow` for a struct with named fields.
///
/// Exactly one field has to be marked with `#[name_column]`. Column headers
/// default to the upper-cased field name and can be overridden with
/// `#[column(header = "...")]`.
#[proc_macro_derive(TableOutputRow, attributes(name_column, column))]
pub fn derive_table_output_row(input: TokenStream) -> TokenStream {
    let parsed_input = parse_macro_input!(input as DeriveInput);

    expand(parsed_input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_ident = input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();
    let fields = match input.data {
        Data::Struct(s) => match s.fields {
            Fields::Named(fields) => fields.named,
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "TableOutputRow is only applicable to structs with named fields!",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                struct_ident.span(),
                "TableOutputRow is only applicable to structs with named fields!",
            ))
        }
    };

    let name_field = get_name_column_field(&fields, &struct_ident)?;
    let headers = fields
        .iter()
        .map(get_column_header)
        .collect::<syn::Result<Vec<_>>>()?;
    let field_names = fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .collect::<Vec<_>>();
    let field_count = field_names.len();

    Ok(quote! {
        impl #impl_generics crate::output::TableOutputRow for #struct_ident #type_generics #where_clause {
            fn get_name(&self) -> ::std::string::String {
                ::std::string::ToString::to_string(&self.#name_field)
            }

            fn get_column_names() -> ::std::vec::Vec<::std::string::String> {
                ::std::vec![#(::std::string::String::from(#headers)),*]
            }

            fn get_column_count() -> usize {
                #field_count
            }

            fn get_row(&self) -> ::std::vec::Vec<::std::string::String> {
                ::std::vec![#(::std::string::ToString::to_string(&self.#field_names)),*]
            }
        }
    })
}

fn get_column_header(field: &Field) -> syn::Result<String> {
    let mut header = None;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("column")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("header") {
                let value: LitStr = meta.value()?.parse()?;
                header = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported column attribute, expected `header`"))
            }
        })?;
    }

    match header {
        Some(header) => Ok(header),
        None => field
            .ident
            .as_ref()
            .map(|i| i.to_string().to_uppercase())
            .ok_or_else(|| syn::Error::new(field.span(), "column field must be named")),
    }
}

fn get_name_column_field<'a>(
    fields: &'a Punctuated<Field, Comma>,
    struct_ident: &Ident,
) -> syn::Result<&'a Ident> {
    let mut marked = fields
        .iter()
        .filter(|f| f.attrs.iter().any(|a| a.path().is_ident("name_column")));

    let field = marked.next().ok_or_else(|| {
        syn::Error::new(
            struct_ident.span(),
            "This struct is missing a '#[name_column]' attribute!",
        )
    })?;

    if let Some(duplicate) = marked.next() {
        return Err(syn::Error::new(
            duplicate.span(),
            "Only one field can be marked with '#[name_column]'!",
        ));
    }

    field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new(field.span(), "name column must be a named field"))
}
