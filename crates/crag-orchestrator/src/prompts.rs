// Prompt templates
//
// Templates use `{name}` placeholders filled by `render`.

/// Grades one retrieved passage against the user question.
pub const RELEVANCY_PROMPT: &str = "As a grader, your task is to evaluate the relevance of a document retrieved in response to a user's question.

Retrieved Document:
-------------------
{context_str}

User Question:
--------------
{query_str}

Evaluation Criteria:
- Consider whether the document contains keywords or topics related to the user's question.
- The evaluation should not be overly stringent; the primary objective is to identify and filter out clearly irrelevant retrievals.

Decision:
- Assign a binary score to indicate the document's relevance.
- Use 'yes' if the document is relevant to the question, or 'no' if it is not.

Please provide your binary score ('yes' or 'no') below to indicate the document's relevance to the user question.";

/// Rewrites the user question into a web search query.
pub const TRANSFORM_QUERY_PROMPT: &str = "Your task is to refine a query to ensure it is highly effective for retrieving relevant search results.
Analyze the given input to grasp the core semantic intent or meaning.
Original Query:
-------
{query_str}
-------
Your goal is to rephrase or enhance this query to improve its search performance. Ensure the revised query is concise and directly aligned with the intended search objective.
Respond with the optimized query only:";

/// Answers the user question from relevant passages and web results.
pub const ANSWER_PROMPT: &str = "As a helpful assistant, your task is to answer the user's question based on the given context.

A few things to keep in mind:
- The context can either be relevant text or web search results.
- The context can also be a mix of both.

Your task is to look at the query and the whole context and generate what you think is the best answer to the question.

Here is the context:
Context:
{context_str}

--------------------------------

Question:
{query_str}

--------------------------------

Generate an answer to the question:
";

/// Answer returned when there is no grounding context at all.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found in the documents.";

/// Placeholder used by the linear pipeline when nothing was retrieved.
pub const NO_RELEVANT_DOCUMENTS: &str = "No relevant documents found.";

/// Fills `{name}` placeholders in a single left-to-right pass.
///
/// Substituted values are never rescanned, so passage text that happens to
/// contain `{query_str}` is left alone. Unknown placeholders are kept verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter().find(|(key, _)| *key == name).map(|(_, value)| (*value, close))
        });
        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
