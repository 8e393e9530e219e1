//! Ordered regex rewrite rules.
//!
//! A rule set is applied top to bottom to a whole file's text. The bundled
//! [`auth_migration_rules`] move API routes from calling
//! `supabase.auth.getUser()` inline to the shared `getVerifiedUser()` helper.

use crate::error::Result;
use crate::transcription::write_atomic;
use regex::{Captures, NoExpand, Regex};
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

/// How a match is replaced.
pub enum Replacement {
    /// Inserted verbatim; `$` has no special meaning.
    Literal(&'static str),
    /// Computed from the captures.
    Function(fn(&Captures<'_>) -> String),
}

/// One pattern → replacement step.
pub struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    replacement: Replacement,
}

impl RewriteRule {
    pub fn literal(name: &'static str, pattern: &str, replacement: &'static str) -> Result<Self> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            replacement: Replacement::Literal(replacement),
        })
    }

    pub fn function(
        name: &'static str,
        pattern: &str,
        replacement: fn(&Captures<'_>) -> String,
    ) -> Result<Self> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            replacement: Replacement::Function(replacement),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replace every match in `input`.
    pub fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        match &self.replacement {
            Replacement::Literal(text) => self.pattern.replace_all(input, NoExpand(*text)),
            Replacement::Function(f) => self.pattern.replace_all(input, |caps: &Captures<'_>| f(caps)),
        }
    }
}

/// Apply rules in order, each to the output of the previous one.
pub fn apply_rules(rules: &[RewriteRule], input: &str) -> String {
    rules.iter().fold(input.to_string(), |text, rule| {
        let rewritten = rule.apply(&text);
        if let Cow::Owned(_) = rewritten {
            debug!("Rule '{}' matched", rule.name());
        }
        rewritten.into_owned()
    })
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Updated,
    Unchanged,
    Missing,
}

/// Rewrite a file in place. The file is only written when the text changed.
pub fn rewrite_file(path: &Path, rules: &[RewriteRule]) -> Result<FileOutcome> {
    if !path.is_file() {
        return Ok(FileOutcome::Missing);
    }

    let original = std::fs::read_to_string(path)?;
    let rewritten = apply_rules(rules, &original);
    if rewritten == original {
        return Ok(FileOutcome::Unchanged);
    }

    write_atomic(path, &rewritten)?;
    Ok(FileOutcome::Updated)
}

const SUPABASE_IMPORT: &str = r"import \{ ([^}]+) \} from '@/lib/supabase-server';";

const GET_USER_WITH_REJECTION: &str = concat!(
    r"    const supabase = await createServerSupabaseClient\(\);", "\n",
    r"    // Use getUser\(\) for better security \(authenticates via Auth server\)", "\n",
    r"    const \{ data: \{ user \}, error: userError \} = await supabase\.auth\.getUser\(\);", "\n",
    "\n",
    r"    if \(userError \|\| !user\) \{", "\n",
    r"      return NextResponse\.json\(", "\n",
    r#"        \{ error: ['"]Unauthorized['"] \},"#, "\n",
    r"        \{ status: 401 \}", "\n",
    r"      \);", "\n",
    r"    \}",
);

const VERIFIED_USER_WITH_REJECTION: &str = "    const user = await getVerifiedUser();

    if (!user) {
      return NextResponse.json(
        { error: 'Unauthorized' },
        { status: 401 }
      );
    }

    const supabase = await createServerSupabaseClient();";

const GET_USER_STORED: &str = concat!(
    r"    const supabase = await createServerSupabaseClient\(\);", "\n",
    r"    // Use getUser\(\) for better security \(authenticates via Auth server\)", "\n",
    r"    const \{ data: \{ user \}, error: userError \} = await supabase\.auth\.getUser\(\);",
);

const VERIFIED_USER_STORED: &str = "    const user = await getVerifiedUser();
    const supabase = await createServerSupabaseClient();";

const GET_USER_UNCOMMENTED: &str = concat!(
    r"    const supabase = await createServerSupabaseClient\(\);", "\n",
    r"    const \{ data: \{ user \}, error: userError \} = await supabase\.auth\.getUser\(\);", "\n",
    "\n",
    r"    if \(userError \|\| !user\) \{",
);

const VERIFIED_USER_GUARD: &str = "    const user = await getVerifiedUser();

    if (!user) {";

/// Add `getVerifiedUser` to the supabase-server import unless already there.
fn add_verified_user_import(caps: &Captures<'_>) -> String {
    let imports = &caps[1];
    if imports.contains("getVerifiedUser") {
        return caps[0].to_string();
    }
    format!("import {{ {}, getVerifiedUser }} from '@/lib/supabase-server';", imports)
}

/// Rules that migrate routes to `getVerifiedUser()`, in application order.
pub fn auth_migration_rules() -> Result<Vec<RewriteRule>> {
    Ok(vec![
        RewriteRule::function("import getVerifiedUser", SUPABASE_IMPORT, add_verified_user_import)?,
        RewriteRule::literal(
            "getUser with 401 rejection",
            GET_USER_WITH_REJECTION,
            VERIFIED_USER_WITH_REJECTION,
        )?,
        RewriteRule::literal("getUser stored in variable", GET_USER_STORED, VERIFIED_USER_STORED)?,
        RewriteRule::literal("getUser without comment", GET_USER_UNCOMMENTED, VERIFIED_USER_GUARD)?,
    ])
}

/// API routes migrated by default, relative to the project root.
pub const DEFAULT_TARGETS: &[&str] = &[
    "src/app/api/admin/database/cleanup/route.ts",
    "src/app/api/admin/database/export/route.ts",
    "src/app/api/admin/database/stats/route.ts",
    "src/app/api/admin/share/route.ts",
    "src/app/api/chat/stream/route.ts",
    "src/app/api/discover/career-options/ai-suggest/route.ts",
    "src/app/api/discover/career-options/analyze-resume/route.ts",
    "src/app/api/discover/career-options/check-prerequisites/route.ts",
    "src/app/api/discover/career-options/session/route.ts",
    "src/app/api/discover/mission/ai-commitments/route.ts",
    "src/app/api/discover/mission/ai-questions/route.ts",
    "src/app/api/discover/mission/ai-roles/route.ts",
    "src/app/api/discover/mission/ai-suggest/route.ts",
    "src/app/api/discover/mission/check-prerequisites/route.ts",
    "src/app/api/discover/mission/context/route.ts",
    "src/app/api/discover/mission/session/route.ts",
    "src/app/api/discover/vision/session/route.ts",
    "src/app/api/dreams/analyze/route.ts",
    "src/app/api/dreams/finalize/route.ts",
    "src/app/api/dreams/generate-suggestions/route.ts",
    "src/app/api/enneagram/answer/route.ts",
    "src/app/api/enneagram/interpret/route.ts",
    "src/app/api/errc/items/[id]/route.ts",
    "src/app/api/errc/items/[id]/steps/route.ts",
    "src/app/api/errc/items/route.ts",
    "src/app/api/errc/reflections/route.ts",
    "src/app/api/errc/session/route.ts",
    "src/app/api/errc/suggestions/route.ts",
    "src/app/api/errc/wellbeing/route.ts",
    "src/app/api/goals/action-plans/route.ts",
    "src/app/api/goals/ai/suggest/route.ts",
    "src/app/api/goals/key-results/route.ts",
    "src/app/api/goals/objectives/route.ts",
    "src/app/api/goals/reflections/route.ts",
    "src/app/api/goals/roles/route.ts",
    "src/app/api/goals/session/route.ts",
    "src/app/api/life-themes/analyze/route.ts",
    "src/app/api/life-themes/responses/route.ts",
    "src/app/api/life-themes/session/route.ts",
    "src/app/api/life-themes/themes/route.ts",
    "src/app/api/swot/auto-fill/route.ts",
    "src/app/api/swot/errc/route.ts",
];
