use {
    darling::{
        ast::{Data, Fields},
        Error, FromDeriveInput, FromField, Result,
    },
    proc_macro2::TokenStream,
    quote::quote,
    syn::{parse_quote, GenericArgument, Generics, Ident, Member, Path, PathArguments, Type},
};

#[derive(FromField)]
#[darling(attributes(bitwire))]
pub(crate) struct Field {
    pub(crate) ident: Option<Ident>,
    pub(crate) ty: Type,

    /// Exactly `n` elements on the wire.
    ///
    /// ```ignore
    /// struct Foo {
    ///     #[bitwire(fixed = 4)]
    ///     bytes: Vec<u8>,
    /// }
    /// ```
    #[darling(default)]
    pub(crate) fixed: Option<usize>,
    /// Elements until the end of the input.
    #[darling(default)]
    pub(crate) end_fill: bool,
}

impl Field {
    /// Get the identifier for a struct member.
    ///
    /// If the field has a named identifier, return it.
    /// Otherwise (tuple struct), return an anonymous identifier with the given index.
    pub(crate) fn struct_member_ident(&self, index: usize) -> Member {
        if let Some(ident) = &self.ident {
            ident.clone().into()
        } else {
            index.into()
        }
    }

    /// Field name as recorded in the schema and in error messages.
    pub(crate) fn wire_name(&self, index: usize) -> String {
        if let Some(ident) = &self.ident {
            ident.to_string()
        } else {
            index.to_string()
        }
    }

    /// The `ArrayPolicy` expression for this field, if it declares one.
    pub(crate) fn policy(&self, crate_name: &Path) -> Result<Option<TokenStream>> {
        match (self.fixed, self.end_fill) {
            (Some(_), true) => Err(Error::custom(
                "`fixed` and `end_fill` cannot both be set on the same field",
            )
            .with_span(&self.ty)),
            (Some(len), false) => Ok(Some(quote! { #crate_name::ArrayPolicy::Fixed(#len) })),
            (None, true) => Ok(Some(quote! { #crate_name::ArrayPolicy::EndFill })),
            (None, false) => Ok(None),
        }
    }
}

/// The element type of a `Vec<E>` field, matched syntactically.
pub(crate) fn vec_element(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != "Vec" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(element) if args.args.len() == 1 => Some(element),
        _ => None,
    }
}

#[derive(FromDeriveInput)]
#[darling(
    attributes(bitwire),
    supports(struct_named, struct_tuple, struct_unit)
)]
pub(crate) struct SchemaArgs {
    pub(crate) ident: Ident,
    pub(crate) generics: Generics,
    pub(crate) data: Data<(), Field>,

    /// Used to determine the `bitwire` path.
    ///
    /// If `internal` is `true`, the generated code will use the `crate::` path.
    /// Otherwise, it will use the `bitwire` path.
    #[darling(default)]
    pub(crate) internal: bool,
    /// `"little"` (default) or `"big"`.
    #[darling(default)]
    pub(crate) endian: Option<String>,
}

impl SchemaArgs {
    pub(crate) fn fields(&self) -> Option<&Fields<Field>> {
        match &self.data {
            Data::Struct(fields) => Some(fields),
            Data::Enum(_) => None,
        }
    }

    /// The `Endian` expression for the struct.
    pub(crate) fn endian(&self, crate_name: &Path) -> Result<TokenStream> {
        match self.endian.as_deref() {
            None | Some("little") => Ok(quote! { #crate_name::Endian::Little }),
            Some("big") => Ok(quote! { #crate_name::Endian::Big }),
            Some(other) => Err(Error::custom(format!(
                "unknown endian `{other}`, expected \"little\" or \"big\""
            ))
            .with_span(&self.ident)),
        }
    }

    pub(crate) fn ensure_not_generic(&self) -> Result<()> {
        if self.generics.params.is_empty() {
            return Ok(());
        }
        Err(
            Error::custom("`BitStruct` cannot be derived for generic types")
                .with_span(&self.generics),
        )
    }
}

/// Get the path to `bitwire` based on the `internal` flag.
pub(crate) fn get_crate_name(args: &SchemaArgs) -> Path {
    if args.internal {
        parse_quote!(crate)
    } else {
        parse_quote!(::bitwire)
    }
}
