// LLM prompt templates for the résumé pipeline and the follow-up chat.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Résumé cleaning. Replace `{bare_output}` and `{resume}`.
pub const RESUME_CLEAN_PROMPT: &str = "请严格按照以下要求为用户简历进行内容清洗，去除用户敏感信息。\
清洗要求：将用户的电话号码、邮箱、QQ号、住址、微信号等敏感信息去除。用户名称只保留姓氏，名用*代替。年龄保留。\
返回格式：直接给出并只允许给出清洗后的完整简历文本内容（原封不动地返回除去用户所有敏感信息后的剩余内容），不修改清洗后简历的任何内容。\
{bare_output}\
以下为用户简历：{resume}";

/// Separator the keyword prompt asks the model to put between phrases.
pub const KEYWORD_SEPARATOR: &str = "<#>";

/// Knowledge-store keyword extraction. Replace `{bare_output}` and `{all_text}`.
pub const KEYWORD_EXTRACT_PROMPT: &str = "请严格按照要求为以下文本（包括用户简历、岗位信息、企业信息等内容）进行内容关键语句提取，用于知识库检索。\
内容提取方向：[企业类型, 岗位类型, 岗位所在行业, 学术科研经历, 学科竞赛经历, 社会实践与领导力经历, 企业相关实践经历]。\
提取要求：简洁清晰完整。每一个关键语句不包含过多的信息点。一个提取方向可以有多条关键语句。\
返回格式：直接给出并只允许给出全部相关联的关键词或语句。每条语句间严格用<#>分割。例如：aa。<#>b，b。<#>cc？\
{bare_output}\
内容文本如下：{all_text}";

/// Combined text the keyword extractor reads. Replace the four fields.
pub const KEYWORD_SOURCE_TEMPLATE: &str =
    "岗位名称：{job_name}。岗位描述：{job_description}。其他信息：{extra_info}。简历内容：{resume}。";

/// Report synthesis. Replace every `{...}` field.
pub const REPORT_PROMPT: &str = "你是一名认真负责的学生就业规划助手，请为用户的简历进行打分并给出优化建议。\
{no_fabrication}\
请按以下结构输出：1. 总体评分（满分100分）及评分理由；2. 分项评分（岗位匹配度、经历含金量、技能覆盖度、表达与排版）；\
3. 与岗位要求相比的主要差距；4. 逐条可执行的优化建议（指出原文并给出修改后的写法）。\
##岗位信息：{job}。\
##其他信息：{extra_info}。\
##用户备注：{user_remarks}。\
##岗位能力要求（知识图谱）：{graph_text}。\
##简历优化知识（知识库）：{store_text}。\
##网络搜索参考：{web_text}。\
##用户简历：{resume}";

/// Follow-up chat over a finished report. Replace the three fields and `{no_fabrication}`.
pub const CHAT_PROMPT: &str = "你是一名认真负责的学生就业规划助手。请结合历史聊天信息、用户的简历打分+优化结果（包括岗位信息、用户简历内容、打分结果及建议等），\
严格遵守给出的打分结果（如存在），回答用户说的话。{no_fabrication}\
如果没有前置信息，请不要随意称呼用户。如果用户说的话和简历优化无关，请向用户温和地表示自己是简历打分+优化助手，同时专心回复用户给出的内容。\
##历史聊天信息：{history}。##用户的简历打分+优化结果：{report}。##用户说的话：{user_prompt}";

/// Fills `{name}` placeholders in one pass over `template`.
///
/// Substituted values are never rescanned, so user text containing `{resume}`
/// or similar stays literal. Unknown `{...}` spans are kept as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let value = after.find('}').and_then(|end| {
            let name = &after[..end];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
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
