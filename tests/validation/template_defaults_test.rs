//! Every builtin template, filled with its defaults, is a clean query.

use std::sync::Arc;

use promsense::completion::{CompletionEngine, ProposalCategory};
use promsense::grammar::ParamKind;
use promsense::{GrammarModel, Validator};

fn grammar() -> Arc<GrammarModel> {
    Arc::new(GrammarModel::builtin())
}

#[test]
fn test_rendered_defaults_validate_clean() {
    let grammar = grammar();
    let validator = Validator::new(grammar.clone());
    for template in grammar.templates() {
        let query = template.render_defaults();
        assert_eq!(
            validator.validate(&query),
            vec![],
            "template {} rendered as {:?}",
            template.name,
            query
        );
    }
}

#[test]
fn test_inserted_templates_validate_clean() {
    let grammar = grammar();
    let validator = Validator::new(grammar.clone());
    let proposals = CompletionEngine::new(grammar).complete("", 0);

    let templates: Vec<_> = proposals
        .iter()
        .filter(|p| p.category == ProposalCategory::Template)
        .collect();
    assert!(!templates.is_empty());

    for proposal in templates {
        let query = proposal.plain_text();
        assert_eq!(validator.validate(&query), vec![], "{}", proposal.label);
    }
}

#[test]
fn test_range_presets_keep_templates_clean() {
    let grammar = grammar();
    let validator = Validator::new(grammar.clone());

    for template in grammar.templates() {
        if !template.parameters.iter().any(|p| p.kind == ParamKind::Range) {
            continue;
        }
        for preset in grammar.range_presets() {
            let mut query = template.render_defaults();
            for param in template.parameters.iter().filter(|p| p.kind == ParamKind::Range) {
                query = query.replace(&format!("[{}]", param.default), &format!("[{}]", preset));
            }
            assert_eq!(
                validator.validate(&query),
                vec![],
                "template {} with range {}",
                template.name,
                preset
            );
        }
    }
}

#[test]
fn test_every_template_parameter_appears_in_skeleton() {
    for template in grammar().templates() {
        for param in template.parameters {
            assert!(
                template.skeleton.contains(&format!(":{}}}", param.name)),
                "{} does not place {}",
                template.name,
                param.name
            );
        }
    }
}
