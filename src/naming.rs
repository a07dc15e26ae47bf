//! Output names for multi-column, multi-function application.

/// A selected column, optionally renamed for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarLabel {
    /// The column name.
    pub column: String,
    /// The name to use in place of `column` in generated names.
    pub alias: Option<String>,
}

impl VarLabel {
    /// Labels a column by its own name.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: None,
        }
    }

    /// Sets the output alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn display(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}

/// Names the outputs of applying `funs` to `vars`, variable-major.
///
/// * A single unnamed function keeps the variable names.
/// * A single unaliased variable under several functions takes the
///   function names; unnamed functions are called `fn1`, `fn2`, ... by
///   their position among the unnamed ones.
/// * Otherwise every output is `{var}_{fun}`.
pub fn cross_names(vars: &[VarLabel], funs: &[Option<String>]) -> Vec<String> {
    let mut unnamed = 0;
    let fun_names: Vec<String> = funs
        .iter()
        .map(|f| match f {
            Some(name) => name.clone(),
            None => {
                unnamed += 1;
                format!("fn{unnamed}")
            }
        })
        .collect();

    if let [only] = funs {
        if only.is_none() {
            return vars.iter().map(|v| v.display().to_string()).collect();
        }
    }
    if let [only] = vars {
        if only.alias.is_none() && funs.len() > 1 {
            return fun_names;
        }
    }
    vars.iter()
        .flat_map(|v| fun_names.iter().map(move |f| format!("{}_{f}", v.display())))
        .collect()
}

/// Makes names unique: the first occurrence keeps its name, later ones get
/// the first free `_1`, `_2`, ... suffix.
pub fn make_unique(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
            continue;
        }
        let mut i = 1;
        let mut candidate = format!("{name}_{i}");
        while out.contains(&candidate) {
            i += 1;
            candidate = format!("{name}_{i}");
        }
        out.push(candidate);
    }
    out
}
