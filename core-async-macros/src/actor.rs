//! Expansion of the `#[actor]` operation registrar.

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::parse::Parser;
use syn::spanned::Spanned;
use syn::{
    parse_quote, Attribute, Block, FnArg, GenericArgument, Ident, ImplItem, ImplItemFn, ItemImpl,
    Pat, PatIdent, PathArguments, ReturnType, Type, TypePath, Visibility,
};

const OPERATION_ATTR: &str = "operation";

struct ActorArgs {
    mailbox: Ident,
}

fn parse_args(attr: TokenStream) -> syn::Result<ActorArgs> {
    let mut mailbox = Ident::new("mailbox", Span::call_site());

    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("mailbox") {
            mailbox = meta.value()?.parse()?;
            Ok(())
        } else {
            Err(meta.error("unsupported actor argument; expected `mailbox = <field>`"))
        }
    });
    parser.parse2(attr)?;

    Ok(ActorArgs { mailbox })
}

/// One `#[operation]` method, split into the pieces the expansion needs.
struct OperationFn {
    attrs: Vec<Attribute>,
    vis: Visibility,
    name: Ident,
    body_name: Ident,
    type_ident: Ident,
    arg_idents: Vec<Ident>,
    arg_pats: Vec<Box<Pat>>,
    arg_types: Vec<Box<Type>>,
    output: Type,
    fallible: bool,
    return_ty: ReturnType,
    block: Block,
}

impl OperationFn {
    fn parse(method: ImplItemFn, actor_name: &str) -> syn::Result<Self> {
        let sig = &method.sig;

        if let Some(asyncness) = sig.asyncness {
            return Err(syn::Error::new_spanned(
                asyncness,
                "actor operations are synchronous bodies; remove `async`",
            ));
        }
        if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
            return Err(syn::Error::new_spanned(
                &sig.generics,
                "actor operations cannot be generic",
            ));
        }

        match sig.receiver() {
            Some(receiver)
                if receiver.reference.is_some()
                    && receiver.mutability.is_none()
                    && receiver.colon_token.is_none() => {}
            _ => {
                return Err(syn::Error::new(
                    sig.span(),
                    "actor operations must take `&self`",
                ))
            }
        }

        let mut arg_idents = Vec::new();
        let mut arg_pats = Vec::new();
        let mut arg_types = Vec::new();
        for (index, input) in sig.inputs.iter().enumerate() {
            let FnArg::Typed(pat_type) = input else {
                continue;
            };
            let ident = match &*pat_type.pat {
                Pat::Ident(PatIdent {
                    ident,
                    by_ref: None,
                    subpat: None,
                    ..
                }) => {
                    if ident.to_string().starts_with("__") {
                        return Err(syn::Error::new_spanned(
                            ident,
                            "operation parameter names starting with `__` are reserved",
                        ));
                    }
                    ident.clone()
                }
                _ => format_ident!("__arg{}", index),
            };
            arg_idents.push(ident);
            arg_pats.push(pat_type.pat.clone());
            arg_types.push(pat_type.ty.clone());
        }

        let (output, fallible) = split_output(&sig.output);
        let name = sig.ident.clone();

        Ok(Self {
            attrs: method
                .attrs
                .into_iter()
                .filter(|attr| !attr.path().is_ident(OPERATION_ATTR))
                .collect(),
            vis: method.vis,
            body_name: format_ident!("__operation_{}", name),
            type_ident: format_ident!("__{}_{}_operation", actor_name, name),
            name,
            arg_idents,
            arg_pats,
            arg_types,
            output,
            fallible,
            return_ty: method.sig.output,
            block: method.block,
        })
    }

    fn entry_point(&self) -> ImplItem {
        let Self {
            attrs,
            vis,
            name,
            type_ident,
            arg_idents,
            arg_types,
            output,
            ..
        } = self;

        parse_quote! {
            #(#attrs)*
            #vis fn #name(
                self: &::std::sync::Arc<Self>,
                #(#arg_idents: #arg_types),*
            ) -> ::core_actor::Message<#output> {
                ::core_actor::dispatch::<Self, #type_ident>(self, (#(#arg_idents,)*))
            }
        }
    }

    fn body(&self) -> ImplItem {
        let Self {
            body_name,
            arg_pats,
            arg_types,
            return_ty,
            block,
            ..
        } = self;

        parse_quote! {
            #[doc(hidden)]
            #[allow(clippy::needless_pass_by_value)]
            fn #body_name(
                &self,
                _: ::core_actor::DispatchToken,
                #(#arg_pats: #arg_types),*
            ) #return_ty #block
        }
    }

    fn definition(&self, self_ty: &Type, actor_name: &str) -> TokenStream {
        let Self {
            name,
            body_name,
            type_ident,
            arg_idents,
            arg_types,
            output,
            fallible,
            ..
        } = self;
        let name_str = name.to_string();

        let call = quote! {
            <#self_ty>::#body_name(__target, __token, #(#arg_idents),*)
        };
        let result = if *fallible {
            quote!(#call.map_err(::core::convert::Into::into))
        } else {
            quote!(::core::result::Result::Ok(#call))
        };

        quote! {
            #[doc(hidden)]
            #[allow(non_camel_case_types)]
            struct #type_ident;

            impl ::core_actor::Operation<#self_ty> for #type_ident {
                type Args = (#(#arg_types,)*);
                type Output = #output;

                const ID: ::core_actor::OperationId =
                    ::core_actor::OperationId::new(#actor_name, #name_str);

                fn invoke(
                    __target: &#self_ty,
                    __args: Self::Args,
                    __token: ::core_actor::DispatchToken,
                ) -> ::core_actor::OperationResult<Self::Output> {
                    let (#(#arg_idents,)*) = __args;
                    #result
                }
            }
        }
    }
}

/// Returns the message output type and whether the body is fallible.
fn split_output(output: &ReturnType) -> (Type, bool) {
    let ReturnType::Type(_, ty) = output else {
        return (parse_quote!(()), false);
    };

    if let Type::Path(TypePath { qself: None, path }) = &**ty {
        if let Some(segment) = path.segments.last() {
            if segment.ident == "Result" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(ok)) = args.args.first() {
                        return (ok.clone(), true);
                    }
                }
            }
        }
    }

    ((**ty).clone(), false)
}

fn actor_name(self_ty: &Type) -> syn::Result<String> {
    match self_ty {
        Type::Path(TypePath { qself: None, path }) => path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| syn::Error::new_spanned(self_ty, "expected a named actor type")),
        _ => Err(syn::Error::new_spanned(
            self_ty,
            "#[actor] requires a named struct or enum type",
        )),
    }
}

fn is_operation(method: &ImplItemFn) -> bool {
    method
        .attrs
        .iter()
        .any(|attr| attr.path().is_ident(OPERATION_ATTR))
}

pub(crate) fn expand(attr: TokenStream, mut input: ItemImpl) -> syn::Result<TokenStream> {
    let args = parse_args(attr)?;

    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[actor] must be placed on an inherent impl block",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic actors are not supported",
        ));
    }

    let self_ty = (*input.self_ty).clone();
    let actor_name = actor_name(&self_ty)?;

    let mut operations = Vec::new();
    let mut items = Vec::with_capacity(input.items.len());
    for item in std::mem::take(&mut input.items) {
        match item {
            ImplItem::Fn(method) if is_operation(&method) => {
                let operation = OperationFn::parse(method, &actor_name)?;
                items.push(operation.entry_point());
                items.push(operation.body());
                operations.push(operation);
            }
            other => items.push(other),
        }
    }
    input.items = items;

    let definitions = operations
        .iter()
        .map(|operation| operation.definition(&self_ty, &actor_name));
    let ids = operations.iter().map(|operation| {
        let type_ident = &operation.type_ident;
        quote!(<#type_ident as ::core_actor::Operation<#self_ty>>::ID)
    });
    let mailbox = &args.mailbox;

    Ok(quote! {
        #input

        #(#definitions)*

        impl ::core_actor::Actor for #self_ty {
            const OPERATIONS: &'static [::core_actor::OperationId] = &[#(#ids),*];

            fn mailbox(&self) -> &::core_actor::Mailbox<Self> {
                &self.#mailbox
            }
        }
    })
}
