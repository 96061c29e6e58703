use {
    crate::common::{get_crate_name, vec_element, Field, SchemaArgs},
    darling::{Error, FromDeriveInput, Result},
    proc_macro2::TokenStream,
    quote::quote,
    syn::{DeriveInput, Path},
};

/// One `StructBuilder` call for the field at `index`.
fn field_decl(index: usize, field: &Field, crate_name: &Path) -> Result<TokenStream> {
    let member = field.struct_member_ident(index);
    let name = field.wire_name(index);
    let ty = &field.ty;

    match field.policy(crate_name)? {
        None => Ok(quote! {
            .field::<#ty>(#name, |s| &s.#member, |s| &mut s.#member)
        }),
        Some(policy) => {
            let element = vec_element(ty).ok_or_else(|| {
                Error::custom("`fixed` and `end_fill` only apply to `Vec<_>` fields").with_span(ty)
            })?;
            Ok(quote! {
                .array::<#element>(#name, #policy, |s| &s.#member, |s| &mut s.#member)
            })
        }
    }
}

pub(crate) fn generate(input: DeriveInput) -> Result<TokenStream> {
    let args = SchemaArgs::from_derive_input(&input)?;
    args.ensure_not_generic()?;
    let ident = &args.ident;
    let crate_name = get_crate_name(&args);
    let endian = args.endian(&crate_name)?;
    let Some(fields) = args.fields() else {
        return Err(Error::custom("`BitStruct` can only be derived for structs").with_span(ident));
    };

    let mut errors = Error::accumulator();
    let decls = fields
        .iter()
        .enumerate()
        .filter_map(|(index, field)| errors.handle(field_decl(index, field, &crate_name)))
        .collect::<Vec<_>>();
    errors.finish()?;

    Ok(quote! {
        const _: () = {
            impl #crate_name::BitStruct for #ident {
                const ENDIAN: #crate_name::Endian = #endian;

                fn describe(fields: &mut #crate_name::StructBuilder<Self>) {
                    let _ = fields #(#decls)*;
                }
            }

            impl #crate_name::Wire for #ident {
                fn class() -> #crate_name::TypeClass {
                    #crate_name::TypeClass::Struct(#crate_name::StructRef::of::<Self>())
                }

                fn zero() -> Self {
                    <Self as ::core::default::Default>::default()
                }

                fn codec(
                    cx: &mut #crate_name::Compiler<'_>,
                    _endian: #crate_name::Endian,
                ) -> ::core::result::Result<#crate_name::Codec<Self>, #crate_name::SchemaError> {
                    cx.nested::<Self>()
                }
            }
        };
    })
}

#[cfg(test)]
mod tests {
    use {super::*, syn::parse_quote};

    fn expand(input: DeriveInput) -> String {
        match generate(input) {
            Ok(tokens) => tokens.to_string(),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn fields_in_declaration_order() {
        let out = expand(parse_quote! {
            #[bitwire(endian = "big")]
            struct Packet {
                kind: u8,
                #[bitwire(fixed = 4)]
                bytes: Vec<u8>,
                #[bitwire(end_fill)]
                rest: Vec<Item>,
            }
        });
        let kind = out.find("\"kind\"").unwrap();
        let bytes = out.find("\"bytes\"").unwrap();
        let rest = out.find("\"rest\"").unwrap();
        assert!(kind < bytes && bytes < rest);
        assert!(out.contains("Endian :: Big"));
        assert!(out.contains("ArrayPolicy :: Fixed (4usize)"));
        assert!(out.contains("ArrayPolicy :: EndFill"));
        assert!(out.contains("impl :: bitwire :: BitStruct for Packet"));
        assert!(!out.contains("use "));
    }

    #[test]
    fn tuple_struct_fields_named_by_index() {
        let out = expand(parse_quote! {
            #[bitwire(internal)]
            struct Pair(u16, u16);
        });
        assert!(out.contains("\"0\""));
        assert!(out.contains("\"1\""));
        assert!(out.contains("Endian :: Little"));
        assert!(out.contains("impl crate :: Wire for Pair"));
    }

    #[test]
    fn policy_on_non_vec_rejected() {
        let out = expand(parse_quote! {
            struct Bad {
                #[bitwire(fixed = 2)]
                value: u32,
            }
        });
        assert!(out.contains("only apply to `Vec<_>` fields"));
    }

    #[test]
    fn unknown_endian_rejected() {
        let out = expand(parse_quote! {
            #[bitwire(endian = "middle")]
            struct Odd {
                value: u32,
            }
        });
        assert!(out.contains("unknown endian `middle`"));
    }

    #[test]
    fn generics_rejected() {
        assert!(generate(parse_quote! {
            struct Wrapper<T> {
                value: T,
            }
        })
        .is_err());
    }

    #[test]
    fn enums_rejected() {
        assert!(generate(parse_quote! {
            enum Choice {
                A,
                B,
            }
        })
        .is_err());
    }
}
