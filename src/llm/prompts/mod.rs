// ABOUTME: System instructions for the sales agent loaded at compile time
// ABOUTME: Combines the agent persona, the business information and the catalog tool guidance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # System Prompts
//!
//! Prompts are loaded at compile time from markdown files for easy maintenance.

/// Persona template with `{app_name}`, `{business_information}` and `{catalog_guidance}` slots
pub const SALES_AGENT_PROMPT: &str = include_str!("sales_agent.md");

/// Guidance appended when the catalog tools are available
pub const CATALOG_TOOLS_PROMPT: &str = include_str!("catalog_tools.md");

/// System instruction for an exchange on behalf of a business
///
/// `with_catalog` adds the tool guidance; it should match whether tools are declared.
#[must_use]
pub fn business_system_instruction(
    app_name: &str,
    business_information: &str,
    with_catalog: bool,
) -> String {
    SALES_AGENT_PROMPT
        .replace("{app_name}", app_name)
        .replace("{business_information}", business_information.trim())
        .replace(
            "{catalog_guidance}",
            if with_catalog { CATALOG_TOOLS_PROMPT } else { "" },
        )
        .trim_end()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_instruction_includes_information() {
        let prompt = business_system_instruction("Algecom", "We sell ceramic mugs.", true);
        assert!(prompt.contains("We sell ceramic mugs."));
        assert!(prompt.contains("Algecom"));
        assert!(prompt.contains("checkInventory"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_instruction_without_catalog() {
        let prompt = business_system_instruction("Algecom", "Opening hours 9-17.", false);
        assert!(!prompt.contains("placeOrder"));
    }
}
