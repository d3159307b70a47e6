//! Pattern matching between a subscription key and a candidate endpoint

use crate::protocol::constants::{
    ANY_VALUE, CATEGORY_KEY, CLASSIFIER_KEY, DEFAULT_CATEGORY, ENABLED_KEY, GROUP_KEY,
    REMOVE_VALUE_PREFIX, VERSION_KEY,
};

use super::url::Endpoint;

/// Decide whether `candidate` satisfies the subscription `pattern`
///
/// Checked in order: service interface (`*` or equal), category, enabled
/// flag, group (`*`, equal, or listed), version (`*` or equal) and
/// classifier (`*`, unset, or equal).
pub fn is_match(pattern: &Endpoint, candidate: &Endpoint) -> bool {
    let wanted = pattern.service_interface();
    if wanted != Some(ANY_VALUE) && wanted != candidate.service_interface() {
        return false;
    }

    if !is_match_category(
        candidate.parameter_or(CATEGORY_KEY, DEFAULT_CATEGORY),
        pattern.parameter(CATEGORY_KEY),
    ) {
        return false;
    }

    if !candidate.bool_parameter(ENABLED_KEY, true)
        && pattern.parameter(ENABLED_KEY) != Some(ANY_VALUE)
    {
        return false;
    }

    let group = pattern.parameter(GROUP_KEY);
    let group_ok = group == Some(ANY_VALUE)
        || group == candidate.parameter(GROUP_KEY)
        || match (group, candidate.parameter(GROUP_KEY)) {
            (Some(groups), Some(g)) => list_contains(groups, g),
            _ => false,
        };

    let version = pattern.parameter(VERSION_KEY);
    let version_ok = version == Some(ANY_VALUE) || version == candidate.parameter(VERSION_KEY);

    let classifier = pattern.parameter(CLASSIFIER_KEY);
    let classifier_ok = match classifier {
        None | Some(ANY_VALUE) => true,
        Some(c) => Some(c) == candidate.parameter(CLASSIFIER_KEY),
    };

    group_ok && version_ok && classifier_ok
}

/// Match a candidate's category against a pattern's category list
///
/// An absent list only admits the default category. `*` admits everything;
/// a list with `-x` entries admits everything except the excluded ones.
pub fn is_match_category(category: &str, categories: Option<&str>) -> bool {
    match categories {
        None => category == DEFAULT_CATEGORY,
        Some(list) if list.contains(ANY_VALUE) => true,
        Some(list) if list.contains(REMOVE_VALUE_PREFIX) => !list
            .split(',')
            .filter_map(|c| c.trim().strip_prefix(REMOVE_VALUE_PREFIX))
            .any(|excluded| excluded == category),
        Some(list) => list_contains(list, category),
    }
}

fn list_contains(list: &str, value: &str) -> bool {
    list.split(',').map(str::trim).any(|v| v == value)
}
