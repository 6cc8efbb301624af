use super::schema::{AgentDefinition, CrewDefinition, Process, TaskDefinition, ToolType};
use crate::types::Variant;

pub fn crew_for(variant: Variant) -> CrewDefinition {
    match variant {
        Variant::Direct => direct_blog_crew(),
        Variant::Mcp => mcp_blog_crew(),
    }
}

/// Researcher and writer, searching through an in-process search API.
pub fn direct_blog_crew() -> CrewDefinition {
    let researcher = AgentDefinition::new(
        "researcher",
        "Senior Research Analyst",
        "Systematically identify, validate, and synthesize the most recent, \
         high-impact findings and developments on a given technical topic, \
         and produce a clear, well-structured briefing with source attributions.",
        r#"You are a Senior Research Analyst at a leading technology think tank, renowned for your rigorous
methodology and attention to detail. You excel at:

- Scoping the project: defining subtopics, keywords, and questions that uncover hidden insights.
- Source vetting: prioritizing peer-reviewed papers, reputable industry reports, and authoritative blogs.
- Synthesis: distilling complex material into concise bullet points, annotated with citations and confidence levels.
- Collaboration: asking clarifying questions when the research scope is ambiguous or too broad."#,
    )
    .with_tools(vec![ToolType::WebSearch]);

    let writer = AgentDefinition::new(
        "writer",
        "Tech Content Strategist & Copywriter",
        "Transform research insights into an engaging, SEO-optimized blog post \
         that communicates complex concepts to a tech-savvy audience, with a clear narrative flow.",
        r#"You are a seasoned Tech Content Strategist and Copywriter, published across top industry outlets.
Your strengths include:

- Audience profiling: adapting tone, terminology, and depth for developers, researchers, or decision-makers.
- Storytelling: crafting a compelling introduction, logical progression of ideas, and memorable takeaways.
- SEO best practices: integrating keywords naturally, writing persuasive headings, and optimizing for readability.
- Revision: incorporating feedback, refining clarity, and ensuring factual accuracy via collaboration with the researcher."#,
    )
    .with_delegation(true);

    let research_task = TaskDefinition {
        name: "research".to_string(),
        description: "Conduct a structured, in-depth exploration of \u{201c}{topic}\u{201d}:\n\
            1. Define key subtopics and research questions.\n\
            2. Source and vet high-quality materials (peer-reviewed papers, industry reports, authoritative blogs).\n\
            3. Synthesize findings into concise bullet points with source citations and confidence annotations.\n\
            4. Highlight emerging trends, breakthrough technologies, leading experts, and potential industry impacts."
            .to_string(),
        expected_output: "A comprehensive research briefing: a bullet-point summary with clear source \
            attributions and confidence ratings."
            .to_string(),
        agent: "researcher".to_string(),
        context: vec![],
    };

    let writing_task = TaskDefinition {
        name: "write".to_string(),
        description: "Using the research briefing on \u{201c}{topic}\u{201d}, craft an engaging, SEO-optimized blog post:\n\
            1. Create a compelling title (use `#`).\n\
            2. Organize content with section headers (use `##`) for Introduction, Body, and Conclusion.\n\
            3. Maintain a logical narrative flow and approachable, human tone.\n\
            4. Explain any technical terms and avoid unexplained jargon.\n\
            5. Use bullet points to clarify lists.\n\
            6. Emphasize key insights with **bold** text.\n\
            7. Output strictly as Markdown (no code blocks or triple backticks)."
            .to_string(),
        expected_output: "A well-crafted Markdown blog post (4\u{2013}6 paragraphs) with title, headings, \
            bullet points, and emphasis."
            .to_string(),
        agent: "writer".to_string(),
        context: vec!["research".to_string()],
    };

    CrewDefinition {
        name: "direct-blog".to_string(),
        agents: vec![researcher, writer],
        tasks: vec![research_task, writing_task],
        process: Process::Sequential,
    }
}

/// Planner, writer and editor; the planner's tools live on the research tool server.
pub fn mcp_blog_crew() -> CrewDefinition {
    let planner = AgentDefinition::new(
        "planner",
        "SEO Researcher and Content Planner",
        "Extract key insights, find SEO keywords, and outline the blog.",
        "You research top articles and produce outlines optimized for engagement and SEO.",
    )
    .with_tools(ToolType::research_suite());

    let writer = AgentDefinition::new(
        "writer",
        "Blog Post Writer",
        "Create a detailed, high-quality blog post using the research and outline.",
        "You are a writer who specializes in transforming outlines into compelling blog posts.",
    );

    let editor = AgentDefinition::new(
        "editor",
        "Blog Editor and Formatter",
        "Edit the blog post, correct grammar, and format it in markdown.",
        "You ensure every blog is well-written, polished, and correctly formatted for publishing.",
    );

    let plan_task = TaskDefinition {
        name: "plan".to_string(),
        description: r#"For the topic "{topic}":

1. Use `multi_engine_search` to find 5 recent, relevant articles.
2. Extract content using `extract_web_content_from_links`.
3. Use `keyword_research` to find SEO keywords.
4. Summarize key findings and generate a structured outline.

The outline should include:
- Title
- Introduction
- 3-4 section headings with bullet points
- Conclusion"#
            .to_string(),
        expected_output: "A blog outline with insights, 5-10 SEO keywords, and detailed structure."
            .to_string(),
        agent: "planner".to_string(),
        context: vec![],
    };

    let write_task = TaskDefinition {
        name: "write".to_string(),
        description: r#"Using the outline and research for "{topic}", write a complete blog post with:

- At least 5-6 paragraphs
- Natural integration of SEO keywords
- Engaging and informative tone
- Clean markdown format

Use examples and factual support where possible."#
            .to_string(),
        expected_output: "Full markdown blog post draft, ready for editing.".to_string(),
        agent: "writer".to_string(),
        context: vec!["plan".to_string()],
    };

    let edit_task = TaskDefinition {
        name: "edit".to_string(),
        description: r#"Edit the blog post for "{topic}":

- Fix grammar and clarity issues
- Enhance tone, transitions, and flow
- Ensure SEO keywords are present naturally
- Format properly in markdown:
    - Use `#` for title
    - `##` for section headers
    - Paragraph spacing and bullet points
    - Bold key phrases if needed

Return the final polished markdown content."#
            .to_string(),
        expected_output: "Final markdown blog post, ready for publishing.".to_string(),
        agent: "editor".to_string(),
        context: vec!["write".to_string()],
    };

    CrewDefinition {
        name: "mcp-blog".to_string(),
        agents: vec![planner, writer, editor],
        tasks: vec![plan_task, write_task, edit_task],
        process: Process::Sequential,
    }
}
