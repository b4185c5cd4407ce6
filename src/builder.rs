//! Materializes a method descriptor plus arguments into a request.

use crate::body::RequestBody;
use crate::codec::{media_type_matches, Codec, Encoding};
use crate::descriptor::{Arg, BindingKind, MethodDescriptor};
use crate::error::Result;
use crate::request::HttpRequest;
use crate::url::{encode_value, UrlBuilder};

const APPLICATION_JSON: &str = "application/json";
const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

fn argument<'a>(descriptor: &MethodDescriptor, args: &'a [Arg], index: usize) -> Result<&'a Arg> {
    args.get(index).ok_or_else(|| {
        descriptor.malformed(format!(
            "binding references argument {index} but only {} were supplied",
            args.len()
        ))
    })
}

fn binding_text(
    descriptor: &MethodDescriptor,
    args: &[Arg],
    index: usize,
    name: &str,
) -> Result<Option<String>> {
    let arg = argument(descriptor, args, index)?;
    match arg.render_text() {
        Some(text) => Ok(Some(text.into_owned())),
        None if arg.is_absent() => Ok(None),
        None => Err(descriptor.malformed(format!(
            "argument {index} bound to '{name}' cannot be rendered as text"
        ))),
    }
}

/// Builds the concrete request for one invocation.
///
/// Substitutes host tokens and path placeholders (encoding values unless
/// the binding is pre-encoded), appends query pairs in declaration order
/// (absent values omitted), assembles headers (literals first, then
/// bindings, later names overwriting), resolves the body content type by
/// precedence, and encodes the body.
pub(crate) fn build_request(
    descriptor: &MethodDescriptor,
    args: &[Arg],
    codec: &dyn Codec,
) -> Result<HttpRequest> {
    let mut host = descriptor.host().to_string();
    let mut path = descriptor.path().to_string();
    let mut url = UrlBuilder::new().with_scheme(descriptor.scheme());

    for binding in descriptor.bindings() {
        match binding.kind {
            BindingKind::Host | BindingKind::Path => {
                let value = binding_text(descriptor, args, binding.index, &binding.name)?
                    .ok_or_else(|| {
                        descriptor.malformed(format!(
                            "substitution value for '{}' is absent",
                            binding.name
                        ))
                    })?;
                let value = if binding.encoded {
                    value
                } else {
                    encode_value(&value)
                };
                let token = format!("{{{}}}", binding.name);
                if binding.kind == BindingKind::Host {
                    host = host.replace(&token, &value);
                } else {
                    path = path.replace(&token, &value);
                }
            }
            BindingKind::Query | BindingKind::Header => {}
        }
    }
    url = url.with_host(host).with_path(path);

    for binding in descriptor.bindings() {
        if binding.kind != BindingKind::Query {
            continue;
        }
        if let Some(value) = binding_text(descriptor, args, binding.index, &binding.name)? {
            let value = if binding.encoded {
                value
            } else {
                encode_value(&value)
            };
            url = url.with_query_parameter(binding.name.clone(), value);
        }
    }

    let mut request = HttpRequest::new(
        descriptor.full_name(),
        descriptor.method().clone(),
        url.build(),
    );

    for literal in descriptor.header_literals() {
        request.headers_mut().set(&literal.name, &literal.value);
    }
    for binding in descriptor.bindings() {
        if binding.kind != BindingKind::Header {
            continue;
        }
        if let Some(value) = binding_text(descriptor, args, binding.index, &binding.name)? {
            request.headers_mut().set(&binding.name, value);
        }
    }

    if let Some(body_binding) = descriptor.body_binding() {
        let arg = argument(descriptor, args, body_binding.index)?;
        if !arg.is_absent() {
            let content_type = body_binding
                .content_type
                .clone()
                .or_else(|| request.headers().value("Content-Type").map(str::to_string))
                .unwrap_or_else(|| match arg {
                    Arg::Bytes(_) | Arg::Text(_) => APPLICATION_OCTET_STREAM.to_string(),
                    _ => APPLICATION_JSON.to_string(),
                });
            request.headers_mut().set("Content-Type", &content_type);

            if let Some(body) = encode_body(arg, &content_type, codec)? {
                request.set_body(body);
            }
        }
    }

    Ok(request)
}

/// Encodes the body argument for the resolved content type. Returns
/// `None` for an empty text body, which is suppressed entirely.
fn encode_body(
    arg: &Arg,
    content_type: &str,
    codec: &dyn Codec,
) -> Result<Option<RequestBody>> {
    let body = match arg {
        Arg::File(segment) => Some(RequestBody::File(segment.clone())),
        Arg::Bytes(data) => Some(RequestBody::Bytes {
            data: data.clone().into(),
            content_type: content_type.to_string(),
        }),
        Arg::Text(text) if text.is_empty() => None,
        Arg::Text(text) => Some(RequestBody::Text {
            text: text.clone(),
            content_type: content_type.to_string(),
        }),
        Arg::Json(value) => {
            let encoding = if media_type_matches(content_type, &[APPLICATION_JSON]) {
                Encoding::Json
            } else if media_type_matches(content_type, &["application/xml", "text/xml"]) {
                Encoding::Xml
            } else {
                Encoding::Json
            };
            Some(RequestBody::Text {
                text: codec.serialize(value, encoding)?,
                content_type: content_type.to_string(),
            })
        }
        Arg::None => None,
    };
    Ok(body)
}
