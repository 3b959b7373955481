//! Derive macros for `structwire`.
//!
//! - `#[derive(Codec)]` - structs (named, tuple, unit) and enums
//! - `#[derive(Protocol)]` - enums wrapping one message type per variant
//!
//! Generated code refers to the runtime crate as `::structwire`.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, parse_quote, Data, DataEnum, DeriveInput, Error, Fields, GenericParam,
    Generics, Ident, Index, Member, Type,
};

/// Derive `structwire::Codec`.
///
/// # Structs
///
/// Fields are encoded in declaration order. Decoding reads each field into
/// its own local, in order, and only then builds the struct. A struct
/// without fields encodes to zero bytes. Every type parameter gets a
/// `Codec` bound.
///
/// # Enums
///
/// A fieldless enum with an integer `#[repr]` encodes as that integer.
/// Decoding an unknown discriminant is an `InvalidData` error. Explicit
/// discriminants without such a repr are rejected, as is `usize`/`isize`.
///
/// Any other enum is a tagged union: the variant index in the smallest
/// sufficient unsigned width, then the variant's fields in order.
#[proc_macro_derive(Codec)]
pub fn derive_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_codec(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Derive `structwire::protocol::Protocol` for an enum of message types.
///
/// Each variant must wrap exactly one type, and no type may appear twice.
/// The declaration order fixes each message's type index:
///
/// ```ignore
/// #[derive(Protocol, Debug, PartialEq)]
/// enum Chat {
///     Hello(Hello), // index 0
///     Lobby(Lobby), // index 1
/// }
/// ```
///
/// Also generated: `Codec` for the enum (same bytes as a tagged message),
/// `Message<Chat>` and `From<_>` for every payload type, and
/// `Dispatch<H>` for every `H` that implements `Handler` for all payloads.
#[proc_macro_derive(Protocol)]
pub fn derive_protocol(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_protocol(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand_codec(input: DeriveInput) -> syn::Result<TokenStream2> {
    match &input.data {
        Data::Struct(data) => Ok(expand_struct(&input, &data.fields)),
        Data::Enum(data) => {
            let repr = int_repr(&input)?;
            let fieldless = is_fieldless(data) && !data.variants.is_empty();
            if let (Some(repr), true) = (&repr, fieldless) {
                return expand_repr_enum(&input, data, repr);
            }
            // The tagged encoding writes the variant index, never the discriminant.
            if let Some((_, expr)) = data.variants.iter().find_map(|v| v.discriminant.as_ref()) {
                let message = if fieldless {
                    "add an integer #[repr(..)] so the discriminant has a wire width"
                } else {
                    "explicit discriminants are only encoded on fieldless enums"
                };
                return Err(Error::new(expr.span(), message));
            }
            Ok(expand_tagged_enum(&input, data))
        }
        Data::Union(data) => Err(Error::new(
            data.union_token.span,
            "unions have no wire representation; use an enum",
        )),
    }
}

fn add_codec_bounds(mut generics: Generics) -> Generics {
    for param in &mut generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(::structwire::Codec));
        }
    }
    generics
}

/// Smallest unsigned tag type for `count` alternatives, and its width.
fn tag_type(count: usize) -> (TokenStream2, usize) {
    if count <= 1 << 8 {
        (quote!(u8), 1)
    } else if count <= 1 << 16 {
        (quote!(u16), 2)
    } else {
        (quote!(u32), 4)
    }
}

struct FieldList<'a> {
    members: Vec<Member>,
    temps: Vec<Ident>,
    types: Vec<&'a Type>,
}

fn field_list(fields: &Fields) -> FieldList<'_> {
    let mut list = FieldList {
        members: Vec::with_capacity(fields.len()),
        temps: Vec::with_capacity(fields.len()),
        types: Vec::with_capacity(fields.len()),
    };
    for (i, field) in fields.iter().enumerate() {
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(Index::from(i)),
        };
        list.members.push(member);
        list.temps.push(format_ident!("__field{}", i));
        list.types.push(&field.ty);
    }
    list
}

/// `path { a: t0, b: t1 }`, `path(t0, t1)` or `path`. Works as both a
/// constructor and a pattern.
fn shape(path: TokenStream2, fields: &Fields, temps: &[Ident]) -> TokenStream2 {
    match fields {
        Fields::Named(named) => {
            let names = named.named.iter().map(|f| &f.ident);
            quote!(#path { #(#names: #temps),* })
        }
        Fields::Unnamed(_) => quote!(#path ( #(#temps),* )),
        Fields::Unit => path,
    }
}

fn decode_fields(list: &FieldList<'_>) -> TokenStream2 {
    let temps = &list.temps;
    let types = &list.types;
    quote! {
        #(let #temps = <#types as ::structwire::Codec>::decode(__buf)?;)*
    }
}

fn fixed_size_expr(types: &[&Type]) -> TokenStream2 {
    quote! {
        ::structwire::__private::sum_fixed_sizes(&[
            #(<#types as ::structwire::Codec>::FIXED_SIZE),*
        ])
    }
}

fn expand_struct(input: &DeriveInput, fields: &Fields) -> TokenStream2 {
    let name = &input.ident;
    let generics = add_codec_bounds(input.generics.clone());
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let list = field_list(fields);
    let members = &list.members;
    let decode = decode_fields(&list);
    let construct = shape(quote!(Self), fields, &list.temps);
    let fixed_size = fixed_size_expr(&list.types);
    let touch = if list.members.is_empty() {
        quote!(let _ = &__buf;)
    } else {
        TokenStream2::new()
    };

    quote! {
        impl #impl_generics ::structwire::Codec for #name #ty_generics #where_clause {
            const FIXED_SIZE: ::core::option::Option<usize> = #fixed_size;

            fn encode<__W: ::structwire::buffer::WireWrite>(
                &self,
                __buf: &mut __W,
            ) -> ::structwire::Result<()> {
                #touch
                #(::structwire::Codec::encode(&self.#members, __buf)?;)*
                ::core::result::Result::Ok(())
            }

            fn decode<__R: ::structwire::buffer::WireRead>(
                __buf: &mut __R,
            ) -> ::structwire::Result<Self> {
                #touch
                #decode
                ::core::result::Result::Ok(#construct)
            }

            fn encoded_size(&self) -> usize {
                match <Self as ::structwire::Codec>::FIXED_SIZE {
                    ::core::option::Option::Some(size) => size,
                    ::core::option::Option::None => {
                        0 #(+ ::structwire::Codec::encoded_size(&self.#members))*
                    }
                }
            }
        }
    }
}

const INT_REPRS: &[&str] = &[
    "u8", "u16", "u32", "u64", "u128", "i8", "i16", "i32", "i64", "i128",
];

/// Integer type named in `#[repr(..)]`, if any. Other repr hints such as
/// `C` or `align(4)` are skipped.
fn int_repr(input: &DeriveInput) -> syn::Result<Option<Ident>> {
    let mut repr = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse::<TokenStream2>()?;
            }
            let Some(ident) = meta.path.get_ident() else {
                return Ok(());
            };
            if ident == "usize" || ident == "isize" {
                return Err(meta.error(
                    "usize/isize have a platform-dependent width; use a fixed-width integer",
                ));
            }
            if INT_REPRS.iter().any(|r| ident == *r) {
                repr = Some(ident.clone());
            }
            Ok(())
        })?;
    }
    Ok(repr)
}

fn is_fieldless(data: &DataEnum) -> bool {
    data.variants
        .iter()
        .all(|v| matches!(v.fields, Fields::Unit))
}

fn expand_repr_enum(input: &DeriveInput, data: &DataEnum, repr: &Ident) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "#[derive(Codec)] on a #[repr] enum does not support generics",
        ));
    }

    let name = &input.ident;
    let name_str = name.to_string();
    let variants: Vec<_> = data.variants.iter().map(|v| &v.ident).collect();

    Ok(quote! {
        impl ::structwire::Codec for #name {
            const FIXED_SIZE: ::core::option::Option<usize> =
                <#repr as ::structwire::Codec>::FIXED_SIZE;

            fn encode<__W: ::structwire::buffer::WireWrite>(
                &self,
                __buf: &mut __W,
            ) -> ::structwire::Result<()> {
                let value: #repr = match self {
                    #(Self::#variants => Self::#variants as #repr,)*
                };
                ::structwire::Codec::encode(&value, __buf)
            }

            fn decode<__R: ::structwire::buffer::WireRead>(
                __buf: &mut __R,
            ) -> ::structwire::Result<Self> {
                let value = <#repr as ::structwire::Codec>::decode(__buf)?;
                #(
                    if value == Self::#variants as #repr {
                        return ::core::result::Result::Ok(Self::#variants);
                    }
                )*
                ::core::result::Result::Err(::structwire::__private::unknown_discriminant(
                    #name_str,
                    value,
                ))
            }

            fn encoded_size(&self) -> usize {
                ::core::mem::size_of::<#repr>()
            }
        }
    })
}

fn expand_tagged_enum(input: &DeriveInput, data: &DataEnum) -> TokenStream2 {
    let name = &input.ident;
    let name_str = name.to_string();
    let generics = add_codec_bounds(input.generics.clone());
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    if data.variants.is_empty() {
        return quote! {
            impl #impl_generics ::structwire::Codec for #name #ty_generics #where_clause {
                fn encode<__W: ::structwire::buffer::WireWrite>(
                    &self,
                    _buf: &mut __W,
                ) -> ::structwire::Result<()> {
                    match *self {}
                }

                fn decode<__R: ::structwire::buffer::WireRead>(
                    __buf: &mut __R,
                ) -> ::structwire::Result<Self> {
                    let index = ::structwire::__private::decode_tag::<u8, __R>(__buf, 0, #name_str)?;
                    ::core::result::Result::Err(::structwire::WireError::InvalidTag {
                        type_name: #name_str,
                        index,
                        count: 0,
                    })
                }

                fn encoded_size(&self) -> usize {
                    match *self {}
                }
            }
        };
    }

    let count = data.variants.len();
    let (tag, width) = tag_type(count);

    let mut encode_arms = Vec::with_capacity(count);
    let mut size_arms = Vec::with_capacity(count);
    let mut decoders = Vec::with_capacity(count);
    let mut variant_sizes = Vec::with_capacity(count);

    for (index, variant) in data.variants.iter().enumerate() {
        let ident = &variant.ident;
        let list = field_list(&variant.fields);
        let temps = &list.temps;
        let pattern = shape(quote!(Self::#ident), &variant.fields, temps);
        let decode = decode_fields(&list);

        encode_arms.push(quote! {
            #pattern => {
                ::structwire::__private::encode_tag::<#tag, __W>(__buf, #index)?;
                #(::structwire::Codec::encode(#temps, __buf)?;)*
            }
        });
        size_arms.push(quote! {
            #pattern => 0 #(+ ::structwire::Codec::encoded_size(#temps))*,
        });
        decoders.push(quote! {
            |__buf: &mut __R| -> ::structwire::Result<Self> {
                #decode
                ::core::result::Result::Ok(#pattern)
            }
        });
        variant_sizes.push(fixed_size_expr(&list.types));
    }

    quote! {
        impl #impl_generics ::structwire::Codec for #name #ty_generics #where_clause {
            const FIXED_SIZE: ::core::option::Option<usize> =
                ::structwire::__private::uniform_fixed_size(#width, &[#(#variant_sizes),*]);

            fn encode<__W: ::structwire::buffer::WireWrite>(
                &self,
                __buf: &mut __W,
            ) -> ::structwire::Result<()> {
                match self {
                    #(#encode_arms)*
                }
                ::core::result::Result::Ok(())
            }

            fn decode<__R: ::structwire::buffer::WireRead>(
                __buf: &mut __R,
            ) -> ::structwire::Result<Self> {
                let table: [fn(&mut __R) -> ::structwire::Result<Self>; #count] = [
                    #(#decoders),*
                ];
                let index = ::structwire::__private::decode_tag::<#tag, __R>(__buf, #count, #name_str)?;
                table[index](__buf)
            }

            fn encoded_size(&self) -> usize {
                #width + match self {
                    #(#size_arms)*
                }
            }
        }
    }
}

struct ProtocolVariant<'a> {
    ident: &'a Ident,
    name: String,
    ty: &'a Type,
}

fn protocol_variants(input: &DeriveInput) -> syn::Result<Vec<ProtocolVariant<'_>>> {
    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(Error::new(
                Span::call_site(),
                "#[derive(Protocol)] expects an enum with one variant per message type",
            ))
        }
    };
    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "#[derive(Protocol)] does not support generics",
        ));
    }
    if data.variants.is_empty() {
        return Err(Error::new(
            input.ident.span(),
            "a protocol needs at least one message type",
        ));
    }

    let mut variants = Vec::with_capacity(data.variants.len());
    let mut seen: Vec<String> = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        let ty = match &variant.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => &fields.unnamed[0].ty,
            _ => {
                return Err(Error::new(
                    variant.span(),
                    "each protocol variant must wrap exactly one message type, e.g. `Hello(Hello)`",
                ))
            }
        };
        let key = quote!(#ty).to_string();
        if seen.contains(&key) {
            return Err(Error::new(
                ty.span(),
                "message type appears twice; each type may occupy only one index",
            ));
        }
        seen.push(key);
        variants.push(ProtocolVariant {
            ident: &variant.ident,
            name: variant.ident.to_string(),
            ty,
        });
    }
    Ok(variants)
}

fn expand_protocol(input: DeriveInput) -> syn::Result<TokenStream2> {
    let variants = protocol_variants(&input)?;
    let name = &input.ident;
    let count = variants.len();
    let (tag, width) = tag_type(count);

    let idents: Vec<_> = variants.iter().map(|v| v.ident).collect();
    let names: Vec<_> = variants.iter().map(|v| v.name.as_str()).collect();
    let types: Vec<_> = variants.iter().map(|v| v.ty).collect();
    let indices: Vec<usize> = (0..count).collect();

    Ok(quote! {
        impl ::structwire::protocol::Protocol for #name {
            type Index = #tag;
            const MESSAGE_COUNT: usize = #count;
            const MESSAGE_NAMES: &'static [&'static str] = &[#(#names),*];

            fn message_index(&self) -> usize {
                match self {
                    #(Self::#idents(_) => #indices,)*
                }
            }

            fn encode_payload<__W: ::structwire::buffer::WireWrite>(
                &self,
                __buf: &mut __W,
            ) -> ::structwire::Result<()> {
                match self {
                    #(Self::#idents(message) => ::structwire::Codec::encode(message, __buf),)*
                }
            }

            fn payload_size(&self) -> usize {
                match self {
                    #(Self::#idents(message) => ::structwire::Codec::encoded_size(message),)*
                }
            }

            fn decode_payload<__R: ::structwire::buffer::WireRead>(
                index: usize,
                __buf: &mut __R,
            ) -> ::structwire::Result<Self> {
                let table: [fn(&mut __R) -> ::structwire::Result<Self>; #count] = [
                    #(
                        |__buf: &mut __R| -> ::structwire::Result<Self> {
                            <#types as ::structwire::Codec>::decode(__buf).map(Self::#idents)
                        }
                    ),*
                ];
                match table.get(index) {
                    ::core::option::Option::Some(decode) => decode(__buf),
                    ::core::option::Option::None => ::core::result::Result::Err(
                        ::structwire::WireError::InvalidMessageType { index, count: #count },
                    ),
                }
            }
        }

        impl ::structwire::Codec for #name {
            fn encode<__W: ::structwire::buffer::WireWrite>(
                &self,
                __buf: &mut __W,
            ) -> ::structwire::Result<()> {
                ::structwire::__private::encode_tag::<#tag, __W>(
                    __buf,
                    ::structwire::protocol::Protocol::message_index(self),
                )?;
                ::structwire::protocol::Protocol::encode_payload(self, __buf)
            }

            fn decode<__R: ::structwire::buffer::WireRead>(
                __buf: &mut __R,
            ) -> ::structwire::Result<Self> {
                let index = ::structwire::protocol::read_message_index::<Self, __R>(__buf)?;
                <Self as ::structwire::protocol::Protocol>::decode_payload(index, __buf)
            }

            fn encoded_size(&self) -> usize {
                #width + ::structwire::protocol::Protocol::payload_size(self)
            }
        }

        #(
            impl ::structwire::protocol::Message<#name> for #types {
                const INDEX: usize = #indices;

                fn into_message(self) -> #name {
                    #name::#idents(self)
                }
            }

            impl ::core::convert::From<#types> for #name {
                fn from(message: #types) -> Self {
                    Self::#idents(message)
                }
            }
        )*

        impl<__H> ::structwire::protocol::Dispatch<__H> for #name
        where
            #(__H: ::structwire::protocol::Handler<#types>,)*
        {
            fn dispatch<__R: ::structwire::buffer::WireRead>(
                index: usize,
                __buf: &mut __R,
                handler: &mut __H,
            ) -> ::structwire::Result<()> {
                let table: [fn(&mut __R, &mut __H) -> ::structwire::Result<()>; #count] = [
                    #(
                        |__buf: &mut __R, handler: &mut __H| -> ::structwire::Result<()> {
                            let message = <#types as ::structwire::Codec>::decode(__buf)?;
                            <__H as ::structwire::protocol::Handler<#types>>::handle(handler, message)
                        }
                    ),*
                ];
                match table.get(index) {
                    ::core::option::Option::Some(dispatch) => dispatch(__buf, handler),
                    ::core::option::Option::None => ::core::result::Result::Err(
                        ::structwire::WireError::InvalidMessageType { index, count: #count },
                    ),
                }
            }
        }
    })
}
