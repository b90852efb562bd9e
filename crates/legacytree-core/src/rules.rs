/// Editing rules for family trees, served to MCP clients as instructions.
pub const RULES: &str = "\
1. One parent link per person. Every person has at most one recorded parent. Add the \
parent the line is traced through; the other parent is recorded as that parent's spouse.\n\
2. Spouses are symmetric and single. Adding a SPOUSE links both people. Someone who already \
has a spouse cannot receive another one; add the new partner elsewhere or leave them out.\n\
3. Lineage versus married-in. A person with a parent, or with children, belongs to the lineage \
and is drawn as a tree node. A parentless, childless person married to a lineage member is \
drawn beside their partner rather than as a separate root.\n\
4. Adding a PARENT re-roots. The target must have no parent yet. By default every other \
parentless lineage member you may edit becomes a sibling of the target under the new parent; \
pass an explicit `siblings` list to adopt only those people. The target's spouse is never \
adopted, and a branch admin cannot adopt anyone outside their branch.\n\
5. SIBLING shares the target's parent. A sibling of a root becomes a new root.\n\
6. Without a target, a new person starts a separate lineage. Several lineages are shown side \
by side under an invisible common top.\n\
7. Dates are ISO `YYYY-MM-DD`. A birth date is required; a death date, when given, must not \
precede it.\n\
8. Permissions. PUBLIC viewers cannot edit. A BRANCH_ADMIN may add people only at their \
assigned person or that person's descendants, never at ancestors, cousins, or new roots. \
A SUPER_ADMIN may edit anywhere. Check with `can_mutate` before proposing a change.\n\
9. Nothing is deleted or re-linked. Tools only add people and set links on them; fix mistakes \
by hand in the tree file.\n\
10. Run `check_tree` after bulk edits. It reports dangling links, one-sided marriages, \
self-references and parent cycles, any of which stop the tree from being drawn.";
