use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Options accepted by `#[conflux::main]` and `#[conflux::test]`.
#[derive(Default)]
pub(crate) struct Options {
    pub(crate) worker_threads: Option<usize>,
}

/// Parses `worker_threads = N` out of the attribute arguments.
///
/// Unknown keys produce an error message suitable for `compile_error!`.
pub(crate) fn parse_options(attr: TokenStream) -> Result<Options, String> {
    let mut options = Options::default();
    let attr = attr.to_string();

    for part in attr.split(',') {
        let part = part.trim();

        if part.is_empty() {
            continue;
        }

        let Some((key, value)) = part.split_once('=') else {
            return Err(format!("expected `key = value`, found `{part}`"));
        };

        match key.trim() {
            "worker_threads" => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => options.worker_threads = Some(n),
                _ => return Err(format!("`worker_threads` must be a positive integer, found `{}`", value.trim())),
            },
            other => return Err(format!("unknown option `{other}`")),
        }
    }

    Ok(options)
}

/// Removes the `async` keyword and replaces the function body with one
/// that runs the original body on a fresh scheduler.
///
/// Returns `None` if no body block was found.
pub(crate) fn wrap_body(item: TokenStream, options: &Options) -> Option<Vec<TokenTree>> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    if let Some(pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(pos);
    }

    let pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))?;

    let body = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => return None,
    };

    let mut builder = String::from("::conflux::Scheduler::builder()");

    if let Some(n) = options.worker_threads {
        builder.push_str(&format!(".worker_threads({n})"));
    }

    let new_body = format!(
        "{{
            let __conflux_scheduler = {builder}
                .build()
                .expect(\"failed to start the conflux scheduler\");
            let __conflux_executor = ::conflux::Executor::new(&__conflux_scheduler);

            __conflux_executor.block_on(async move {{ {body} }})
        }}"
    );

    let stream = new_body.parse().ok()?;
    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    Some(tokens)
}

/// Expands to a `compile_error!` carrying `message`.
pub(crate) fn compile_error(message: &str) -> TokenStream {
    format!("compile_error!({message:?});")
        .parse()
        .unwrap_or_default()
}
