use crate::parser;

/// The parameters attached to a property, in the order they appeared.
///
/// Names are matched exactly; when a parameter is repeated the last value
/// wins on lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    parameters: Vec<parser::Parameter>,
}

impl<I> From<I> for ParameterSet
where
    I: IntoIterator<Item = parser::Parameter>,
{
    fn from(iter: I) -> Self {
        ParameterSet {
            parameters: iter.into_iter().collect(),
        }
    }
}

impl ParameterSet {
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .rev()
            .find(|param| param.name == name)
            .map(|param| param.value.as_str())
    }
}
